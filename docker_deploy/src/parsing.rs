use std::{fmt, net::IpAddr, str::FromStr};

use stacked_errors::{bail, Error, Result, StackableErr};

/// A parsed port mapping like the argument of `docker run -p
/// [host_ip:][host_port:]container_port[/protocol]`.
///
/// The CLI backend passes mappings to the runtime as they are, this is for
/// backends that need the parts separately.
///
///```
/// use docker_deploy::PortBind;
///
/// let pb: PortBind = "127.0.0.1:8080:80".parse().unwrap();
/// assert_eq!(pb.container_port, 80);
/// assert_eq!(pb.host_port, Some(8080));
/// assert_eq!(pb.host_ip, Some("127.0.0.1".parse().unwrap()));
/// assert_eq!(pb.protocol, "tcp");
/// assert_eq!(pb.to_string(), "127.0.0.1:8080:80/tcp");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortBind {
    pub container_port: u16,
    /// `None` lets the runtime choose an ephemeral host port
    pub host_port: Option<u16>,
    /// `None` binds to all interfaces
    pub host_ip: Option<IpAddr>,
    /// "tcp" unless specified
    pub protocol: String,
}

impl PortBind {
    /// Results in the port mapping `<port>:<port>`
    pub fn new(port: u16) -> Self {
        Self {
            container_port: port,
            host_port: Some(port),
            host_ip: None,
            protocol: "tcp".to_owned(),
        }
    }

    /// Returns the key docker uses for exposed ports, e.x. "80/tcp"
    pub fn container_port_key(&self) -> String {
        format!("{}/{}", self.container_port, self.protocol)
    }
}

fn parse_port(s: &str, what: &str) -> Result<u16> {
    s.parse::<u16>()
        .stack_err_with(|| format!("invalid {what} \"{s}\""))
}

impl FromStr for PortBind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (ports, protocol) = match s.trim().split_once('/') {
            Some((ports, protocol)) => (ports, protocol),
            None => (s.trim(), "tcp"),
        };
        if !matches!(protocol, "tcp" | "udp" | "sctp") {
            bail!("PortBind::from_str(\"{s}\") -> unknown protocol \"{protocol}\"")
        }
        // the IP part can itself contain colons if it is a bracketed IPv6 address
        let mut parts: Vec<&str> = ports.rsplitn(3, ':').collect();
        parts.reverse();
        let (host_ip, host_port, container_port) = match parts.as_slice() {
            [container] => (None, None, *container),
            [host, container] => (None, Some(*host), *container),
            [ip, host, container] => (Some(*ip), Some(*host), *container),
            _ => bail!("PortBind::from_str(\"{s}\") -> empty port mapping"),
        };
        let container_port = parse_port(container_port, "container port")
            .stack_err_with(|| format!("PortBind::from_str(\"{s}\")"))?;
        // "ip::80" leaves the host port up to the runtime
        let host_port = match host_port {
            Some(host_port) if !host_port.is_empty() => Some(
                parse_port(host_port, "host port")
                    .stack_err_with(|| format!("PortBind::from_str(\"{s}\")"))?,
            ),
            _ => None,
        };
        let host_ip = match host_ip {
            Some(ip) => {
                let ip = ip.trim_start_matches('[').trim_end_matches(']');
                Some(ip.parse::<IpAddr>().stack_err_with(|| {
                    format!("PortBind::from_str(\"{s}\") -> invalid host IP")
                })?)
            }
            None => None,
        };
        Ok(Self {
            container_port,
            host_port,
            host_ip,
            protocol: protocol.to_owned(),
        })
    }
}

impl fmt::Display for PortBind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.host_ip {
            Some(IpAddr::V6(ip)) => write!(f, "[{ip}]:")?,
            Some(IpAddr::V4(ip)) => write!(f, "{ip}:")?,
            None => (),
        }
        if let Some(host_port) = self.host_port {
            write!(f, "{host_port}:")?;
        } else if self.host_ip.is_some() {
            f.write_str(":")?;
        }
        write!(f, "{}/{}", self.container_port, self.protocol)
    }
}

impl From<u16> for PortBind {
    /// Calls `Self::new(port)`
    fn from(port: u16) -> Self {
        Self::new(port)
    }
}

/// Splits an image reference into the repository and the tag (or digest) the
/// way the Engine API's image pull takes them. A reference without either gets
/// the "latest" tag, an empty tag would make the daemon pull every tag of the
/// repository.
///
/// ```
/// use docker_deploy::split_image_reference;
///
/// assert_eq!(split_image_reference("nginx"), ("nginx", "latest"));
/// assert_eq!(split_image_reference("nginx:1.27"), ("nginx", "1.27"));
/// assert_eq!(
///     split_image_reference("localhost:5000/app"),
///     ("localhost:5000/app", "latest")
/// );
/// ```
pub fn split_image_reference(image: &str) -> (&str, &str) {
    if let Some((repository, digest)) = image.split_once('@') {
        return (repository, digest)
    }
    // a colon before the last slash belongs to a registry port
    let name_start = image.rfind('/').map_or(0, |i| i + 1);
    match image[name_start..].rfind(':') {
        Some(i) => (&image[..(name_start + i)], &image[(name_start + i + 1)..]),
        None => (image, "latest"),
    }
}
