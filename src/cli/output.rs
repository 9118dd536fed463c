use std::net::IpAddr;

use colored::Colorize;

use crate::error::IntiError;
use crate::types::{Program, Submission};

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn program_line(program: &Program, is_tty: bool) -> String {
    let status = if program.status.value.is_empty() {
        "-"
    } else {
        program.status.value.as_str()
    };
    if is_tty {
        format!(
            "{}  {}  {}",
            program.id.dimmed(),
            program.name.bold(),
            format!("[{status}]").cyan()
        )
    } else {
        format!("{}  {}  [{status}]", program.id, program.name)
    }
}

pub fn print_programs(programs: &[Program], json_mode: bool, is_tty: bool) {
    if json_mode {
        print_json(programs);
        return;
    }
    if programs.is_empty() {
        println!("No programs found.");
        return;
    }
    for program in programs {
        println!("{}", program_line(program, is_tty));
    }
}

fn submission_line(submission: &Submission, is_tty: bool) -> String {
    let severity = if submission.severity.value.is_empty() {
        "-"
    } else {
        submission.severity.value.as_str()
    };
    let status = &submission.state.status.value;
    if !is_tty {
        return format!(
            "{}  {}  [{status}] ({severity})",
            submission.code, submission.title
        );
    }

    let status = if submission.is_closed() {
        status.dimmed()
    } else {
        status.yellow()
    };
    let severity = match severity.to_lowercase().as_str() {
        "critical" | "exceptional" => severity.red().bold(),
        "high" => severity.red(),
        "medium" => severity.yellow(),
        _ => severity.normal(),
    };
    format!(
        "{}  {}  [{}] ({})",
        submission.code.bold(),
        submission.title,
        status,
        severity
    )
}

pub fn print_submissions(submissions: &[Submission], json_mode: bool, is_tty: bool) {
    if json_mode {
        print_json(submissions);
        return;
    }
    if submissions.is_empty() {
        println!("No submissions found.");
        return;
    }
    for submission in submissions {
        println!("{}", submission_line(submission, is_tty));
    }
}

pub fn print_ip_lookup(ip: &IpAddr, known: bool, json_mode: bool, is_tty: bool) {
    if json_mode {
        print_json(&serde_json::json!({ "ip": ip.to_string(), "exists": known }));
        return;
    }
    let verdict = match (known, is_tty) {
        (true, true) => "known to the platform".green().to_string(),
        (false, true) => "not known to the platform".red().to_string(),
        (true, false) => "known to the platform".to_string(),
        (false, false) => "not known to the platform".to_string(),
    };
    println!("{ip} is {verdict}");
}

pub fn print_auth_status(authenticated: bool, json_mode: bool, is_tty: bool) {
    if json_mode {
        print_json(&serde_json::json!({ "authenticated": authenticated }));
        return;
    }
    let message = if authenticated {
        "Authenticated"
    } else {
        "Not authenticated"
    };
    if is_tty {
        let styled = if authenticated {
            message.green().bold()
        } else {
            message.red().bold()
        };
        println!("{styled}");
    } else {
        println!("{message}");
    }
}

pub fn print_error(err: &IntiError, json_mode: bool) {
    if json_mode {
        print_json(&err.to_json());
    } else {
        eprintln!("Error: {err}");
    }
}
