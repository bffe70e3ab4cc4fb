//! Ordered compute-device capability probing.
//!
//! A run asks a list of probes, in priority order, which device it should
//! report as selected. The dense kernels in this crate execute on the host
//! for every device, so the choice never changes numerical results; it is
//! recorded in the run status and logs.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeDevice {
    Cuda,
    Metal,
    Cpu,
}

impl fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComputeDevice::Cuda => "cuda",
            ComputeDevice::Metal => "metal",
            ComputeDevice::Cpu => "cpu",
        };
        f.write_str(s)
    }
}

/// One capability check.
pub trait DeviceProbe: Send + Sync {
    /// The device this probe vouches for, if available on this host.
    fn probe(&self) -> Option<ComputeDevice>;
}

/// NVIDIA GPU: present when the kernel driver is loaded.
#[derive(Debug, Default)]
pub struct CudaProbe;

impl DeviceProbe for CudaProbe {
    fn probe(&self) -> Option<ComputeDevice> {
        let driver = Path::new("/proc/driver/nvidia/version").exists()
            || Path::new("/dev/nvidia0").exists();
        driver.then_some(ComputeDevice::Cuda)
    }
}

/// Apple-silicon GPU.
#[derive(Debug, Default)]
pub struct MetalProbe;

impl DeviceProbe for MetalProbe {
    fn probe(&self) -> Option<ComputeDevice> {
        (cfg!(target_os = "macos") && cfg!(target_arch = "aarch64")).then_some(ComputeDevice::Metal)
    }
}

#[derive(Debug, Default)]
pub struct CpuProbe;

impl DeviceProbe for CpuProbe {
    fn probe(&self) -> Option<ComputeDevice> {
        Some(ComputeDevice::Cpu)
    }
}

/// Accelerator first, alternate accelerator second, CPU last.
pub fn default_probes() -> Vec<Box<dyn DeviceProbe>> {
    vec![Box::new(CudaProbe), Box::new(MetalProbe), Box::new(CpuProbe)]
}

/// First device any probe reports; CPU when none does.
pub fn select_device(probes: &[Box<dyn DeviceProbe>]) -> ComputeDevice {
    probes.iter()
        .find_map(|p| p.probe())
        .unwrap_or(ComputeDevice::Cpu)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<ComputeDevice>);

    impl DeviceProbe for Fixed {
        fn probe(&self) -> Option<ComputeDevice> {
            self.0
        }
    }

    #[test]
    fn first_available_probe_wins() {
        let probes: Vec<Box<dyn DeviceProbe>> = vec![
            Box::new(Fixed(None)),
            Box::new(Fixed(Some(ComputeDevice::Metal))),
            Box::new(CpuProbe),
        ];
        assert_eq!(select_device(&probes), ComputeDevice::Metal);
    }

    #[test]
    fn falls_back_to_cpu() {
        assert_eq!(select_device(&[]), ComputeDevice::Cpu);
        let probes: Vec<Box<dyn DeviceProbe>> = vec![Box::new(Fixed(None))];
        assert_eq!(select_device(&probes), ComputeDevice::Cpu);
        assert_eq!(ComputeDevice::Cuda.to_string(), "cuda");
    }
}
