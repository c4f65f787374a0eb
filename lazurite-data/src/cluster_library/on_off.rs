//! # On/Off Cluster

/// On/Off cluster
pub const CLUSTER: u16 = 0x0006;
/// On/Off cluster attribute, current state
pub const ATTR_ON_OFF: u16 = 0x0000;

/// On/Off cluster command, turn off
pub const CMD_OFF: u8 = 0x00;
/// On/Off cluster command, turn on
pub const CMD_ON: u8 = 0x01;
/// On/Off cluster command, toggle
pub const CMD_TOGGLE: u8 = 0x02;
