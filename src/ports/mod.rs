//! Trait seams between policy and transport.

pub mod bastion;
pub mod dialer;
pub mod lookup;

pub use bastion::{BastionConnector, CommandOutput};
pub use dialer::{JumpAuth, JumpConnection, JumpDialer};
pub use lookup::{DeviceLookup, DeviceRecord, StaticDeviceLookup};
