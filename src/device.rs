//! Compute accelerator selection.
//!
//! The model is bound to exactly one execution provider, picked once at
//! startup by walking a preference list and keeping the first entry whose
//! sessions actually build. A provider that is compiled into ONNX Runtime
//! but has no working hardware fails registration and is skipped.

use crate::{Error, Result};
use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, CoreMLExecutionProvider,
    ExecutionProviderDispatch,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    /// Apple GPU / Neural Engine via CoreML.
    CoreMl,
    /// NVIDIA GPU via CUDA.
    Cuda,
    Cpu,
}

impl Device {
    pub const PREFERENCE: [Device; 3] = [Device::CoreMl, Device::Cuda, Device::Cpu];

    pub fn as_str(&self) -> &'static str {
        match self {
            Device::CoreMl => "coreml",
            Device::Cuda => "cuda",
            Device::Cpu => "cpu",
        }
    }

    /// Provider dispatch for session builders. Accelerators refuse to
    /// register instead of silently running on CPU.
    pub fn execution_provider(&self) -> ExecutionProviderDispatch {
        match self {
            Device::CoreMl => CoreMLExecutionProvider::default().build().error_on_failure(),
            Device::Cuda => CUDAExecutionProvider::default().build().error_on_failure(),
            Device::Cpu => CPUExecutionProvider::default().build(),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs `attempt` for each device in `preferences` and returns the first
/// success together with the device it ran on.
///
/// CPU is the floor: it is tried last when the list does not already
/// contain it, including when the list is empty.
pub fn select_with<T, F>(preferences: &[Device], mut attempt: F) -> Result<(Device, T)>
where
    F: FnMut(Device) -> Result<T>,
{
    let mut candidates = preferences.to_vec();
    if !candidates.contains(&Device::Cpu) {
        candidates.push(Device::Cpu);
    }

    let mut last_error = None;
    for device in candidates {
        match attempt(device) {
            Ok(value) => {
                info!("Device selected: {}", device);
                return Ok((device, value));
            }
            Err(e) => {
                warn!("Execution provider {} is not usable: {}", device, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::model("no execution provider could be used")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::cell::RefCell;

    fn only(available: &[Device]) -> impl FnMut(Device) -> Result<Device> + '_ {
        move |d| {
            if d == Device::Cpu || available.contains(&d) {
                Ok(d)
            } else {
                Err(Error::model(format!("{} session failed to build", d)))
            }
        }
    }

    #[rstest]
    #[case(&[Device::CoreMl, Device::Cuda], Device::CoreMl)]
    #[case(&[Device::Cuda], Device::Cuda)]
    #[case(&[], Device::Cpu)]
    fn test_first_working_device_wins(#[case] available: &[Device], #[case] expected: Device) {
        let (chosen, built) = select_with(&Device::PREFERENCE, only(available)).unwrap();
        assert_eq!(chosen, expected);
        assert_eq!(built, expected);
    }

    #[test]
    fn test_failed_build_moves_to_next_device() {
        let tried = RefCell::new(Vec::new());
        let (chosen, _) = select_with(&Device::PREFERENCE, |d| {
            tried.borrow_mut().push(d);
            only(&[])(d)
        })
        .unwrap();

        assert_eq!(chosen, Device::Cpu);
        assert_eq!(
            *tried.borrow(),
            vec![Device::CoreMl, Device::Cuda, Device::Cpu]
        );
    }

    #[test]
    fn test_cpu_is_appended_when_missing() {
        let (chosen, _) = select_with(&[Device::Cuda, Device::CoreMl], only(&[])).unwrap();
        assert_eq!(chosen, Device::Cpu);

        let (chosen, _) = select_with(&[], only(&[])).unwrap();
        assert_eq!(chosen, Device::Cpu);
    }

    #[test]
    fn test_custom_order_is_respected() {
        let (chosen, _) =
            select_with(&[Device::Cuda, Device::CoreMl], |d| Ok::<_, Error>(d)).unwrap();
        assert_eq!(chosen, Device::Cuda);
    }

    #[test]
    fn test_error_when_nothing_builds() {
        let result = select_with(&Device::PREFERENCE, |d| {
            Err::<(), _>(Error::model(format!("{} broken", d)))
        });
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "Model error: cpu broken");
    }

    #[test]
    fn test_serde_names() {
        let devices: Vec<Device> = serde_json::from_str(r#"["core_ml","cuda","cpu"]"#).unwrap();
        assert_eq!(devices, Device::PREFERENCE.to_vec());
        assert_eq!(Device::CoreMl.to_string(), "coreml");
    }
}
