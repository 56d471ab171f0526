//! Command-line front end for the iterative resolver.
//!
//! ```bash
//! # Walk from the root servers down to the answer
//! dns-walker resolve www.example.com
//!
//! # Ask one server directly and dump the whole response
//! dns-walker query example.com --server 8.8.8.8 --recursion-desired
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::debug;

use dns_walker::dns::{DnsMessage, QueryType, RECURSION_DESIRED};
use dns_walker::{Resolver, ResolverConfig, logging};

#[derive(Parser, Debug)]
#[command(name = "dns-walker")]
#[command(version)]
#[command(about = "Resolve domain names by walking the DNS delegation tree")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE", global = true)]
    config: Option<String>,

    /// Per-hop timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a name iteratively, starting at a root nameserver
    Resolve {
        domain: String,

        /// Record type to resolve (A or AAAA)
        #[arg(short = 't', long = "type", default_value = "A", value_parser = parse_query_type)]
        qtype: QueryType,

        /// Root nameserver to start from instead of the configured hint
        #[arg(long)]
        root: Option<Ipv4Addr>,
    },

    /// Send a single query to one server and print the response
    Query {
        domain: String,

        /// Nameserver to ask
        #[arg(short = 's', long)]
        server: IpAddr,

        #[arg(short = 't', long = "type", default_value = "A", value_parser = parse_query_type)]
        qtype: QueryType,

        /// Ask the server to recurse on our behalf
        #[arg(long)]
        recursion_desired: bool,
    },
}

fn parse_query_type(s: &str) -> Result<QueryType, String> {
    QueryType::from_str(s)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ResolverConfig::load(cli.config.as_deref())?;
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.validate()?;

    logging::init_logging(&config.logging.level);
    debug!(?config, "Configuration loaded");

    let mut resolver = Resolver::from_config(config);

    match cli.command {
        Command::Resolve {
            domain,
            qtype,
            root,
        } => {
            let root = root.unwrap_or(resolver.config().root_hint);
            let addr = resolver
                .resolve(&domain, qtype, root)
                .with_context(|| format!("resolving {}", domain))?;
            println!("{}", addr);
        }
        Command::Query {
            domain,
            server,
            qtype,
            recursion_desired,
        } => {
            let flags = if recursion_desired { RECURSION_DESIRED } else { 0 };
            println!(
                "Querying {} for {} records of {}...",
                server, qtype, domain
            );
            println!("------------------------------------");

            let message = resolver
                .send_query(server, &domain, qtype, flags)
                .with_context(|| format!("querying {} for {}", server, domain))?;
            print_message(&message);
        }
    }

    Ok(())
}

fn print_message(message: &DnsMessage) {
    println!("Header: {:?}", message.header);
    println!("Status: {}", message.header.response_code());
    println!();

    println!("Question Section:");
    for question in &message.questions {
        println!("  - QNAME: {}, QTYPE: {}", question.name, question.qtype);
    }

    for (title, records) in [
        ("Answer", &message.answers),
        ("Authority", &message.authorities),
        ("Additional", &message.additionals),
    ] {
        println!();
        if records.is_empty() {
            println!("{} Section: No records found.", title);
            continue;
        }
        println!("{} Section:", title);
        for record in records {
            println!("  - {}", record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults() {
        let cli = Cli::try_parse_from(["dns-walker", "resolve", "www.example.com"]).unwrap();
        match cli.command {
            Command::Resolve {
                domain,
                qtype,
                root,
            } => {
                assert_eq!(domain, "www.example.com");
                assert_eq!(qtype, QueryType::A);
                assert_eq!(root, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_query_with_options() {
        let cli = Cli::try_parse_from([
            "dns-walker",
            "query",
            "example.com",
            "-s",
            "8.8.8.8",
            "-t",
            "ns",
            "--recursion-desired",
            "--timeout-ms",
            "250",
        ])
        .unwrap();

        assert_eq!(cli.timeout_ms, Some(250));
        match cli.command {
            Command::Query {
                server,
                qtype,
                recursion_desired,
                ..
            } => {
                assert_eq!(server, IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)));
                assert_eq!(qtype, QueryType::NS);
                assert!(recursion_desired);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_type() {
        assert!(Cli::try_parse_from(["dns-walker", "resolve", "example.com", "-t", "BOGUS"]).is_err());
    }

    #[test]
    fn test_query_requires_server() {
        assert!(Cli::try_parse_from(["dns-walker", "query", "example.com"]).is_err());
    }
}
