use std::path::PathBuf;

use clap::{
    Parser,
    Subcommand,
};
use furnace_store::Capabilities;
use furnace_store_tool::{
    parse_capabilities,
    SettingsRecord,
    FLASH_SECTOR_SIZE,
};

#[derive(Parser)]
#[command(name = "furnace-store-tool")]
#[command(about = "Furnace settings image generator and parser", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a flash image of both store sectors from a settings CSV file
    Generate {
        /// Input CSV file path
        input: PathBuf,

        /// Output binary file path
        output: PathBuf,

        /// Size of one store sector in bytes (must be a multiple of 4096)
        #[arg(short, long, value_parser = parse_size, default_value_t = FLASH_SECTOR_SIZE)]
        sector_size: usize,

        /// Subsystems of the target build, e.g. `water,pilot`, `all` or `none`
        #[arg(short, long, value_parser = parse_capability_list, default_value = "all")]
        capabilities: Capabilities,
    },
    /// Parse a flash image dumped from a controller into a settings CSV file
    Parse {
        /// Input binary file path
        input: PathBuf,

        /// Output CSV file path
        output: PathBuf,

        /// Subsystems of the build that wrote the image
        #[arg(short, long, value_parser = parse_capability_list, default_value = "all")]
        capabilities: Capabilities,
    },
}

fn parse_size(s: &str) -> Result<usize, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        usize::from_str_radix(hex, 16).map_err(|e| e.to_string())
    } else {
        s.parse::<usize>().map_err(|e| e.to_string())
    }
}

fn parse_capability_list(s: &str) -> Result<Capabilities, String> {
    parse_capabilities(s).map_err(|e| e.to_string())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            input,
            output,
            sector_size,
            capabilities,
        } => {
            println!("Parsing CSV file: {}", input.display());
            let record = SettingsRecord::from_csv_file(&input, capabilities)?;
            println!("Capabilities: {:?} (mask {:#04x})", capabilities, capabilities.to_mask());

            println!("Generating image...");
            record.generate_image_file(&output, sector_size)?;

            println!("Successfully generated image: {}", output.display());
            println!("Size: {} bytes (2 sectors of {} bytes)", 2 * sector_size, sector_size);

            Ok(())
        }
        Commands::Parse {
            input,
            output,
            capabilities,
        } => {
            println!("Parsing image file: {}", input.display());
            let report = SettingsRecord::parse_image_file(&input, capabilities)?;
            println!("Cursors: A {:?}, B {:?}", report.cursors.0, report.cursors.1);
            println!("Repair: {:?}", report.boot.repair);
            println!("Source: {:?}", report.boot.source);
            if let Some(header) = &report.header {
                println!("Header: {header}");
            }

            println!("Writing CSV file...");
            report.record.to_csv_file(&output)?;

            println!("Successfully parsed image to: {}", output.display());

            Ok(())
        }
    }
}
