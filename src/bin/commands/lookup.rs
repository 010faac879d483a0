use ipmeta::database::GeoliteDatabase;
use ipmeta::datasets::{BatchResolver, DnsxResolver};
use ipmeta::lens::ip::{IpLens, IpLookupArgs};
use ipmeta::lens::utils::OutputFormat;
use ipmeta::IpmetaConfig;
use std::io::Write;

pub fn run(config: &IpmetaConfig, args: IpLookupArgs, output_format: OutputFormat) {
    // the resolver binary must exist before any input is processed
    let resolver = if args.resolve {
        match DnsxResolver::new(&config.resolver_binary()) {
            Ok(r) => Some(r.with_timeout(config.resolver_timeout())),
            Err(e) => {
                eprintln!("ERROR: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        None
    };

    let db = match GeoliteDatabase::open(&config.asn_db_path, &config.city_db_path) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            eprintln!(
                "Download the GeoLite2 databases into {} or set asn_db_path / city_db_path",
                config.data_dir
            );
            std::process::exit(1);
        }
    };

    let lines = match args.read_lines() {
        Ok(lines) => lines,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let lens = IpLens::new(&db);
    let report = match lens.annotate(
        &args,
        &lines,
        resolver.as_ref().map(|r| r as &dyn BatchResolver),
    ) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    for warning in &report.warnings {
        eprintln!("WARNING: {}", warning);
    }

    match lens.format_report(&report, output_format) {
        Ok(output) => {
            let mut stdout = std::io::stdout();
            if let Err(e) = writeln!(stdout, "{}", output) {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    eprintln!("{e}");
                }
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("ERROR: unable to format output: {}", e);
            std::process::exit(1);
        }
    }
}
