//! Bindings to `libgaia_real_ai_core` and `libreal_ai_embodied`.
//!
//! All `extern "C"` declarations for the controller live here.
//!
//! # Safety
//!
//! Every function below is unsafe FFI. Callers must ensure:
//! - a context pointer comes from the matching `*_create` call and is non-null
//! - input buffers hold at least `input_len` floats
//! - output and confidence buffers hold at least [`DECISION_LEN`] floats
//! - a context is never used from two threads at once

use std::{
    ffi::CString,
    os::raw::{c_char, c_float},
    ptr::NonNull,
};

use super::{CoreOutput, DecisionCore, CONTEXT_LEN, DECISION_LEN};
use crate::error::{ControllerError, ControllerResult};

/// Opaque decision core context.
#[repr(C)]
pub struct GaiaRealAiCore {
    _private: [u8; 0],
}

/// Opaque embodied state context.
#[repr(C)]
pub struct RealAiEmbodied {
    _private: [u8; 0],
}

#[link(name = "gaia_real_ai_core")]
extern "C" {
    /// Allocates a core context. Null on failure.
    pub fn gaia_real_ai_create() -> *mut GaiaRealAiCore;

    /// Configures a core context from a JSON document.
    pub fn gaia_real_ai_initialize(ctx: *mut GaiaRealAiCore, config_json: *const c_char) -> bool;

    /// Runs one decision. Writes [`DECISION_LEN`] floats to each output buffer.
    pub fn gaia_real_ai_make_decision(
        ctx: *mut GaiaRealAiCore,
        input: *const c_float,
        input_len: usize,
        output: *mut c_float,
        confidence: *mut c_float,
    ) -> bool;

    /// Applies [`DECISION_LEN`] floats of feedback.
    pub fn gaia_real_ai_adapt(
        ctx: *mut GaiaRealAiCore,
        feedback: *const c_float,
        strength: c_float,
    ) -> bool;
}

#[link(name = "real_ai_embodied")]
extern "C" {
    /// Allocates an embodied context. Null on failure.
    pub fn real_ai_embodied_create() -> *mut RealAiEmbodied;

    /// Configures an embodied context from a JSON document.
    pub fn real_ai_embodied_initialize(ctx: *mut RealAiEmbodied, config_json: *const c_char) -> bool;
}

/// Decision core backed by the native libraries.
///
/// Neither library exports a destructor, so contexts live for the process.
#[derive(Debug)]
pub struct NativeCore {
    core: NonNull<GaiaRealAiCore>,
    embodied: NonNull<RealAiEmbodied>,
}

// SAFETY: the contexts are only reached through `&mut self`, and `CoreHandle`
// guarantees one call at a time.
unsafe impl Send for NativeCore {}

impl NativeCore {
    /// Creates both native contexts.
    pub fn create() -> ControllerResult<Self> {
        // SAFETY: argument-free constructors; null is checked below.
        let core = NonNull::new(unsafe { gaia_real_ai_create() }).ok_or_else(|| {
            ControllerError::Initialization("gaia_real_ai_create returned null".into())
        })?;
        // SAFETY: as above.
        let embodied = NonNull::new(unsafe { real_ai_embodied_create() }).ok_or_else(|| {
            ControllerError::Initialization("real_ai_embodied_create returned null".into())
        })?;
        Ok(Self { core, embodied })
    }
}

impl DecisionCore for NativeCore {
    fn name(&self) -> &str {
        "native"
    }

    fn initialize(&mut self, config_json: &str) -> ControllerResult<()> {
        let config = CString::new(config_json)
            .map_err(|err| ControllerError::Initialization(format!("config contains nul: {err}")))?;
        // SAFETY: valid context from `create`, nul-terminated config outliving the call.
        if !unsafe { gaia_real_ai_initialize(self.core.as_ptr(), config.as_ptr()) } {
            return Err(ControllerError::Initialization(
                "gaia_real_ai_initialize reported failure".into(),
            ));
        }
        // SAFETY: as above.
        if !unsafe { real_ai_embodied_initialize(self.embodied.as_ptr(), config.as_ptr()) } {
            return Err(ControllerError::Initialization(
                "real_ai_embodied_initialize reported failure".into(),
            ));
        }
        Ok(())
    }

    fn decide(&mut self, input: &[f32; CONTEXT_LEN]) -> ControllerResult<CoreOutput> {
        let mut output = CoreOutput::default();
        // SAFETY: input holds CONTEXT_LEN floats, both outputs hold DECISION_LEN.
        let ok = unsafe {
            gaia_real_ai_make_decision(
                self.core.as_ptr(),
                input.as_ptr(),
                CONTEXT_LEN,
                output.decision.as_mut_ptr(),
                output.confidence.as_mut_ptr(),
            )
        };
        if ok {
            Ok(output)
        } else {
            Err(ControllerError::ExternalCall(
                "gaia_real_ai_make_decision reported failure".into(),
            ))
        }
    }

    fn adapt(&mut self, feedback: &[f32; DECISION_LEN], strength: f32) -> ControllerResult<()> {
        // SAFETY: feedback holds DECISION_LEN floats.
        if unsafe { gaia_real_ai_adapt(self.core.as_ptr(), feedback.as_ptr(), strength) } {
            Ok(())
        } else {
            Err(ControllerError::ExternalCall(
                "gaia_real_ai_adapt reported failure".into(),
            ))
        }
    }
}
