use clap::Args;
use ipmeta::lens::utils::OutputFormat;
use ipmeta::IpmetaConfig;
use serde::Serialize;
use std::path::Path;

/// Arguments for the Config command
#[derive(Args)]
pub struct ConfigArgs {
    /// Show size and modification time of the database files
    #[clap(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Serialize)]
struct ConfigInfo {
    config_file: String,
    #[serde(flatten)]
    settings: IpmetaConfig,
    dnsx_resolved: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    files: Option<Vec<FileInfo>>,
}

#[derive(Debug, Serialize)]
struct FileInfo {
    name: String,
    path: String,
    exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified_unix: Option<u64>,
}

fn file_info(name: &str, path: &str) -> FileInfo {
    let metadata = std::fs::metadata(path).ok();
    let modified_unix = metadata
        .as_ref()
        .and_then(|m| m.modified().ok())
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs());

    FileInfo {
        name: name.to_string(),
        path: path.to_string(),
        exists: Path::new(path).exists(),
        size_bytes: metadata.map(|m| m.len()),
        modified_unix,
    }
}

pub fn run(
    config: &IpmetaConfig,
    config_file: Option<&str>,
    args: ConfigArgs,
    output_format: OutputFormat,
) {
    let ConfigArgs { verbose } = args;

    let config_file = config_file
        .map(str::to_string)
        .unwrap_or_else(IpmetaConfig::config_file_path);

    let files = verbose.then(|| {
        vec![
            file_info("asn", &config.asn_db_path),
            file_info("city", &config.city_db_path),
        ]
    });

    let config_info = ConfigInfo {
        config_file,
        settings: config.clone(),
        dnsx_resolved: config
            .resolver_binary()
            .locate()
            .ok()
            .map(|p| p.display().to_string()),
        files,
    };

    if !output_format.is_json() {
        print_config_table(config, &config_info);
        return;
    }

    let json = match output_format {
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&config_info),
        _ => serde_json::to_string(&config_info),
    };
    match json {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config info: {}", e),
    }
}

fn print_config_table(config: &IpmetaConfig, info: &ConfigInfo) {
    println!("ipmeta Configuration");
    println!("====================\n");

    println!("Config file:        {}", info.config_file);
    println!("{}", config.summary());

    if let Some(ref files) = info.files {
        println!();
        println!("Database Files:");
        println!("  {:<6} {:>12}  {}", "Name", "Size", "Path");
        println!("  {}", "-".repeat(72));
        for file in files {
            let size = file
                .size_bytes
                .map(format_size)
                .unwrap_or_else(|| "-".to_string());
            println!("  {:<6} {:>12}  {}", file.name, size, file.path);
        }
    }

    eprintln!();
    eprintln!("Tips:");
    eprintln!("  Use --verbose (-v) to see database file sizes");
    eprintln!("  Use --format json for machine-readable output");
    eprintln!("  Edit ~/.ipmeta/ipmeta.toml or set IPMETA_* variables to customize settings");
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
