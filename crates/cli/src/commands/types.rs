//! The `types` command - lists the supported executor types.

use warden::ExecType;

pub fn run() {
    for exec_type in ExecType::ALL {
        println!("{exec_type}");
    }
}
