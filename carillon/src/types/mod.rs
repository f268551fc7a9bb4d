pub mod alarm;

pub use alarm::{Alarm, AlarmId, AlarmMessage, ChangeRequest, GroupId};
