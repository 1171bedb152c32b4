mod checksum;
mod encoding;
mod identify;
mod iso15693;
mod plan;
mod titxt;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use iso15693::Uid;
use lazarus_core::{
    converter::{ChannelSelector, ConverterSettings},
    config,
    dispatch::COMMAND_ID_RANGE,
    memory::{FirmwareControl, FIRMWARE_CONTROL_ADDRESS, NDEF_ADDRESS},
    ndef::{UriRecord, DEFAULT_IMAGE},
};
use log::{debug, info};
use std::path::PathBuf;
use strum::IntoEnumIterator;

/// Host side tools for the NFC thermometer.
#[derive(Parser)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a TI-TXT payload and list the writes that deliver it
    Plan {
        file: PathBuf,

        /// Print the write frames addressed to this tag UID
        #[arg(long)]
        uid: Option<Uid>,
    },

    /// Compute the header checksum of hex encoded bytes
    Checksum { hex: String },

    /// Decode the response to the sample command
    DecodeReply { hex: String },

    /// Tell what kind of sensor a tag is from blocks 0 to 2 and block 39
    Identify {
        #[arg(long)]
        uid: Uid,

        /// Blocks 0 to 2, hex encoded
        header: String,

        /// Block 39, hex encoded
        key_block: String,
    },

    /// Print the tag memory image
    TagImage,

    /// Print a request frame
    Frame {
        #[command(subcommand)]
        frame: Frame,
    },

    /// Print the converter register values for every channel
    Registers,
}

#[derive(Subcommand)]
enum Frame {
    /// Read one or more blocks
    Read {
        #[arg(long)]
        uid: Uid,

        #[arg(long)]
        block: u8,

        #[arg(long, default_value_t = 1)]
        count: usize,
    },

    /// Request a sample through the custom command
    Sample {
        #[arg(long, value_parser = encoding::parse_u16, default_value_t = config::CUSTOM_COMMAND.command_id)]
        command_id: u16,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Plan { file, uid } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let plan = plan::DeliveryPlan::from_titxt(&text)
                .with_context(|| format!("Invalid payload {}", file.display()))?;
            info!("Payload has {} sections", plan.sections().len());

            for write in plan.writes() {
                match &uid {
                    Some(uid) => println!("{}", encoding::encode(&write.frame(uid)?)),
                    None => println!(
                        "block {:3} ({} blocks): {}",
                        write.block,
                        write.data.len() / iso15693::BLOCK_SIZE,
                        encoding::encode(write.data)
                    ),
                }
            }
        }
        Command::Checksum { hex: input } => {
            let bytes = encoding::decode(&input)?;
            debug!("CRC-16/MCRF4XX {:#06x}", checksum::CRC.checksum(&bytes));

            println!("{:#06x}", checksum::checksum(&bytes));

            if let Some(check) = checksum::HeaderCheck::of(&bytes) {
                println!(
                    "header: stored {:#06x}, computed {:#06x}, {}",
                    check.stored,
                    check.computed,
                    if check.is_valid() { "valid" } else { "invalid" }
                );
            }
        }
        Command::DecodeReply { hex: input } => {
            let response = encoding::decode(&input)?;
            let sample = iso15693::decode_sample(&response)?;
            println!("{sample} ({sample:#06x})");
        }
        Command::Identify {
            uid,
            header,
            key_block,
        } => {
            let header = encoding::decode(&header)?;
            let key_block = encoding::decode(&key_block)?;

            let key = identify::program_key(&uid, &header, &key_block)
                .context("Not a sensor that can be identified")?;
            info!("Program key {:#06x}", key);

            println!("{}", identify::Sensor::classify(key));
        }
        Command::TagImage => {
            let control = FirmwareControl::default();
            println!(
                "{FIRMWARE_CONTROL_ADDRESS:#06x}: {:02X} (firmware control)",
                control.bits()
            );
            println!("{NDEF_ADDRESS:#06x}: {}", encoding::encode(&DEFAULT_IMAGE));

            let record = UriRecord::parse(&DEFAULT_IMAGE)?;
            println!(
                "URI: {}{}",
                record.prefix.as_str(),
                String::from_utf8_lossy(record.uri)
            );
        }
        Command::Frame { frame } => {
            let frame = match frame {
                Frame::Read { uid, block, count } if count == 1 => {
                    iso15693::read_single_block(&uid, block)
                }
                Frame::Read { uid, block, count } => {
                    iso15693::read_multiple_blocks(&uid, block, count)?
                }
                Frame::Sample { command_id } => {
                    if !COMMAND_ID_RANGE.contains(&command_id) {
                        bail!("Command ID {command_id:#06x} is not a custom command");
                    }
                    // The range fits in the single byte command code
                    iso15693::custom_command(command_id as u8).to_vec()
                }
            };
            println!("{}", encoding::encode(&frame));
        }
        Command::Registers => {
            for (name, settings) in [
                ("sampling", ConverterSettings::sampling()),
                ("polled", ConverterSettings::polled()),
            ] {
                println!("{name}: SD14CTL0 {:#06x}", settings.ctl0().get());
                for channel in ChannelSelector::iter() {
                    let channel_name: &'static str = channel.into();
                    println!(
                        "  {channel_name:20} SD14CTL1 {:#06x}",
                        settings.ctl1(channel).get()
                    );
                }
            }
        }
    }

    Ok(())
}
