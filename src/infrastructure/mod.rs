pub mod equipment_profile;
pub mod equipment_simulator;

pub use equipment_profile::{profile, EquipmentProfile};
pub use equipment_simulator::{
    command_for, EquipmentSimulator, EquipmentStatus, SeedPolicy, SUCCESS_RATE,
};
