//! Hostname resolution through the `dnsx` command-line tool
//!
//! `dnsx` is invoked once per run with the whole host list on its stdin and
//! `-json` output, producing one JSON object per resolved host:
//!
//! ```text
//! {"host":"example.com","resolver":["1.1.1.1:53"],"a":["93.184.215.14"],"status_code":"NOERROR","timestamp":"2024-05-01T10:00:00.000000000+00:00"}
//! ```
//!
//! Hosts that produce no output are simply absent from the result. Lines that
//! are empty or do not decode are dropped.

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Name of the resolver executable
pub const DNSX_BIN: &str = "dnsx";

/// Flags requesting A records, CNAME chains and JSON-per-line output
const DNSX_ARGS: [&str; 3] = ["-a", "-json", "-cname"];

const POLL_INTERVAL: Duration = Duration::from_millis(50);

// =============================================================================
// Records
// =============================================================================

/// One resolved host as reported by `dnsx`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub host: String,
    #[serde(default)]
    pub status_code: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub resolver: Vec<String>,
    /// A-record addresses; may be empty
    #[serde(default)]
    pub a: Vec<String>,
    /// CNAME chain; may be empty
    #[serde(default)]
    pub cname: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub soa: Vec<serde_json::Value>,
}

/// Parse `dnsx -json` output, skipping empty and malformed lines
pub fn parse_output(output: &str) -> Vec<ResolutionRecord> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(
            |line| match serde_json::from_str::<ResolutionRecord>(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    debug!("skipping malformed resolver output line ({}): {}", e, line);
                    None
                }
            },
        )
        .collect()
}

// =============================================================================
// Resolver trait
// =============================================================================

/// Batch hostname resolver: all hosts in, all records out
pub trait BatchResolver {
    fn resolve(&self, hosts: &[String]) -> Result<Vec<ResolutionRecord>>;
}

// =============================================================================
// Binary discovery
// =============================================================================

/// Where to find the resolver executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverBinary {
    /// An explicitly configured path
    Path(PathBuf),
    /// Search `$GOPATH/bin` first, then every directory of `PATH`
    Discover {
        gopath: Option<PathBuf>,
        search_path: Option<OsString>,
    },
}

impl ResolverBinary {
    /// Discovery strategy seeded from the process environment
    pub fn from_env() -> Self {
        ResolverBinary::Discover {
            gopath: std::env::var_os("GOPATH").map(PathBuf::from),
            search_path: std::env::var_os("PATH"),
        }
    }

    /// Resolve to an existing executable path
    pub fn locate(&self) -> Result<PathBuf> {
        match self {
            ResolverBinary::Path(path) => {
                if path.is_file() {
                    Ok(path.clone())
                } else {
                    Err(anyhow!("Command {} not found", path.display()))
                }
            }
            ResolverBinary::Discover {
                gopath,
                search_path,
            } => {
                let gopath_bin = gopath.iter().map(|p| p.join("bin"));
                let path_dirs = search_path
                    .iter()
                    .flat_map(|p| std::env::split_paths(p))
                    .filter(|p| !p.as_os_str().is_empty());

                gopath_bin
                    .chain(path_dirs)
                    .map(|dir| dir.join(DNSX_BIN))
                    .find(|candidate| candidate.is_file())
                    .ok_or_else(|| anyhow!("Command {} not found", DNSX_BIN))
            }
        }
    }
}

// =============================================================================
// dnsx subprocess
// =============================================================================

/// [`BatchResolver`] backed by one blocking `dnsx` invocation
#[derive(Debug, Clone)]
pub struct DnsxResolver {
    bin: PathBuf,
    timeout: Option<Duration>,
}

impl DnsxResolver {
    /// Locate the binary up front; a missing binary is fatal.
    pub fn new(binary: &ResolverBinary) -> Result<Self> {
        let bin = binary.locate()?;
        info!("using resolver binary {}", bin.display());
        Ok(Self { bin, timeout: None })
    }

    /// Kill the subprocess and fail if it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    fn spawn(&self) -> Result<Child> {
        Command::new(&self.bin)
            .args(DNSX_ARGS)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| anyhow!("Unable to start {}: {}", self.bin.display(), e))
    }

    /// Wait for the child, killing it once the deadline passes
    fn wait_with_deadline(&self, child: &mut Child, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if child.try_wait()?.is_some() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                if let Err(e) = child.kill() {
                    warn!("failed to kill resolver process: {}", e);
                }
                let _ = child.wait();
                bail!(
                    "{} did not finish within {} seconds",
                    self.bin.display(),
                    timeout.as_secs()
                );
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

fn read_to_end<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            if let Err(e) = pipe.read_to_end(&mut buf) {
                warn!("failed reading resolver output: {}", e);
            }
        }
        buf
    })
}

impl BatchResolver for DnsxResolver {
    fn resolve(&self, hosts: &[String]) -> Result<Vec<ResolutionRecord>> {
        if hosts.is_empty() {
            return Ok(vec![]);
        }

        let mut child = self.spawn()?;

        // stdin is fed from its own thread so a large output can't block the write
        let input = hosts.join("\n") + "\n";
        let stdin = child.stdin.take();
        let writer = thread::spawn(move || -> std::io::Result<()> {
            if let Some(mut stdin) = stdin {
                stdin.write_all(input.as_bytes())?;
            }
            Ok(())
        });
        let stdout = read_to_end(child.stdout.take());
        let stderr = read_to_end(child.stderr.take());

        match self.timeout {
            Some(timeout) => self.wait_with_deadline(&mut child, timeout)?,
            None => {
                child.wait()?;
            }
        }

        match writer.join() {
            Ok(Err(e)) => warn!("failed writing hosts to resolver: {}", e),
            Err(_) => warn!("resolver input thread panicked"),
            Ok(Ok(())) => {}
        }
        let stdout = stdout
            .join()
            .map_err(|_| anyhow!("resolver output thread panicked"))?;
        let stderr = stderr.join().unwrap_or_default();
        if !stderr.is_empty() {
            debug!("resolver stderr: {}", String::from_utf8_lossy(&stderr));
        }

        let records = parse_output(&String::from_utf8_lossy(&stdout));
        info!(
            "resolver returned {} records for {} hosts",
            records.len(),
            hosts.len()
        );
        Ok(records)
    }
}
