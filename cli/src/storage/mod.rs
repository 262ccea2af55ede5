//! Local storage: config file location and contents

pub mod layout;
pub mod settings;
