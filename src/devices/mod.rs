// SPDX-FileCopyrightText: The k2io authors
// SPDX-License-Identifier: MPL-2.0

pub mod xone_k2;

/// Static properties of a supported device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub vendor_name: &'static str,
    pub product_name: &'static str,
    /// Default name of both the input and the output port.
    pub port_name: &'static str,
}
