use tunnel_manager::ServiceKind;

pub fn run_services() {
    println!(
        "{:<12} {:<26} {:<8} DESCRIPTION",
        "SERVICE", "ALIASES", "PORT"
    );
    for kind in ServiceKind::ALL {
        println!(
            "{:<12} {:<26} {:<8} {}",
            kind.name(),
            kind.aliases().join(", "),
            kind.default_remote_port(),
            kind.description()
        );
    }
}
