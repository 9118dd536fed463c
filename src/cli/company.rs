use std::io::IsTerminal;
use std::net::IpAddr;

use crate::api::ip_lookup::is_faulty_ip;
use crate::client::Client;
use crate::error::IntiError;
use crate::types::{filter_submissions, SubmissionFilter};

use super::output;

fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Parse and vet an address given on the command line.
///
/// Runs before any client is built so bad input never costs a login.
pub fn parse_ip_argument(input: &str) -> Result<IpAddr, IntiError> {
    let ip: IpAddr = input
        .trim()
        .parse()
        .map_err(|_| IntiError::InvalidArgument(format!("Invalid IP address '{input}'")))?;
    if is_faulty_ip(&ip) {
        return Err(IntiError::InvalidArgument(format!(
            "{ip} is a private, loopback or link-local address"
        )));
    }
    Ok(ip)
}

/// `*` and the empty string select every program.
pub fn program_filter(program_id: Option<&str>) -> Option<&str> {
    program_id
        .map(str::trim)
        .filter(|id| !id.is_empty() && *id != "*")
}

pub async fn run_list(client: &Client, json_mode: bool) -> Result<(), IntiError> {
    let programs = client.programs().await?;
    tracing::debug!(count = programs.len(), "fetched programs");
    output::print_programs(&programs, json_mode, is_tty());
    Ok(())
}

pub async fn run_submissions(
    client: &Client,
    program_id: Option<&str>,
    active_only: bool,
    json_mode: bool,
) -> Result<(), IntiError> {
    let program_id = program_filter(program_id);
    let submissions = match program_id {
        Some(id) => client.program_submissions(id).await?,
        None => client.submissions().await?,
    };

    let filter = SubmissionFilter {
        program_id: None,
        active_only,
    };
    let submissions = filter_submissions(submissions, &filter);
    output::print_submissions(&submissions, json_mode, is_tty());
    Ok(())
}

pub async fn run_ip(client: &Client, ip: IpAddr, json_mode: bool) -> Result<(), IntiError> {
    let known = client.is_known_ip(ip).await?;
    output::print_ip_lookup(&ip, known, json_mode, is_tty());
    Ok(())
}

pub async fn run_auth(client: &Client, json_mode: bool) -> Result<(), IntiError> {
    client.authenticate().await?;
    output::print_auth_status(client.is_authenticated().await, json_mode, is_tty());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ip_accepts_public_addresses() {
        assert_eq!(
            parse_ip_argument(" 8.8.8.8 ").unwrap(),
            "8.8.8.8".parse::<IpAddr>().unwrap()
        );
        assert!(parse_ip_argument("2001:4860:4860::8888").is_ok());
    }

    #[test]
    fn parse_ip_rejects_garbage_and_private() {
        assert!(matches!(
            parse_ip_argument("not-an-ip"),
            Err(IntiError::InvalidArgument(_))
        ));
        for addr in ["10.1.2.3", "127.0.0.1", "fe80::1", "169.254.0.1"] {
            assert!(parse_ip_argument(addr).is_err(), "{addr} should be rejected");
        }
    }

    #[test]
    fn wildcard_program_means_all() {
        assert_eq!(program_filter(None), None);
        assert_eq!(program_filter(Some("*")), None);
        assert_eq!(program_filter(Some("  ")), None);
        assert_eq!(program_filter(Some("abc")), Some("abc"));
    }
}
