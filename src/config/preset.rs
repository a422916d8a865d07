use super::Settings;

/// A named bundle of default field values.
#[derive(Debug, Clone, Copy)]
pub struct Profile {
    pub name: &'static str,
    pub container_name: Option<&'static str>,
    pub image: Option<&'static str>,
    pub ports: &'static [&'static str],
    pub environment: &'static [&'static str],
    pub network: Option<&'static str>,
    pub ip: Option<&'static str>,
}

/// Built-in defaults of the `sim` command family.
pub const SIM_DEFAULTS: Profile = Profile {
    name: "sim",
    container_name: Some("wasim-docker"),
    image: Some("wiscauto/wa_simulator:latest"),
    ports: &[],
    environment: &[],
    network: None,
    ip: Some("172.20.0.3"),
};

/// The `docker` family has no built-in defaults.
pub const DOCKER_DEFAULTS: Profile = Profile {
    name: "docker",
    container_name: None,
    image: None,
    ports: &[],
    environment: &[],
    network: None,
    ip: None,
};

/// Values typical for `wa_simulator` runs, selected with `--wasim`.
pub const WASIM: Profile = Profile {
    name: "wasim",
    container_name: Some("wasim-docker"),
    image: Some("wiscauto/wa_simulator:latest"),
    ports: &["5555:5555"],
    environment: &["DISPLAY=novnc:0.0"],
    network: Some("wa"),
    ip: Some("172.20.0.3"),
};

/// A noVNC desktop so GUI windows from other containers can be viewed in a browser.
pub const NOVNC: Profile = Profile {
    name: "novnc",
    container_name: Some("novnc"),
    image: Some("theasp/novnc:latest"),
    ports: &["8080:8080"],
    environment: &[
        "DISPLAY_WIDTH=5000",
        "DISPLAY_HEIGHT=5000",
        "RUN_XTERM=no",
        "RUN_FLUXBOX=yes",
    ],
    network: Some("wa"),
    ip: Some("172.20.0.4"),
};

impl Profile {
    pub fn settings(&self) -> Settings {
        Settings {
            name: self.container_name.map(str::to_string),
            image: self.image.map(str::to_string),
            ports: self.ports.iter().map(|p| p.to_string()).collect(),
            environment: self.environment.iter().map(|e| e.to_string()).collect(),
            network: self.network.map(str::to_string),
            ip: self.ip.map(str::to_string),
        }
    }
}
