//! dm-bridge - command protocol tool for BLE color-matrix displays
//!
//! Usage:
//!   dm-bridge encode 0x09                 Print the frame for GET_VOLUME
//!   dm-bridge decode "01 04 00 09 07 ..." Parse a notification
//!   dm-bridge sprite heart.toml           Print image upload commands
//!   dm-bridge send 0x46 --wait            Dry run against a simulated device

use clap::Parser;
use dm_bridge::cache::CharacteristicCache;
use dm_bridge::cli::{Cli, Command, HexBytes};
use dm_bridge::codec::{chunks, to_hex, Notification};
use dm_bridge::commands::{self, Command as DeviceCommand};
use dm_bridge::config::{self, Config};
use dm_bridge::error::{Error, Result};
use dm_bridge::logging;
use dm_bridge::pixel;
use dm_bridge::session::{CommandSession, SessionConfig};
use dm_bridge::sprite::{self, Sprite};
use dm_bridge::transport::MemoryTransport;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, warn};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => config::load_strict(path)?,
        None => config::load(&config::config_path()),
    };
    if let Some(protocol) = cli.protocol {
        config.session.protocol = protocol;
    }

    match cli.command {
        Command::Encode {
            opcode,
            args,
            packet,
            chunk_size,
        } => run_encode(&config, opcode, &args.0, packet, chunk_size),
        Command::Decode { frame } => run_decode(&config, &frame.0),
        Command::Sprite { file, part_size } => run_sprite(&config, &file, part_size),
        Command::Send {
            opcode,
            args,
            wait,
            reply,
            timeout_ms,
            device,
        } => {
            let runtime = tokio::runtime::Runtime::new().map_err(|e| Error::Io {
                path: "tokio runtime".into(),
                source: e,
            })?;
            let request = SendRequest {
                command: DeviceCommand::new(opcode, args.0),
                wait,
                reply,
                timeout: timeout_ms.map(Duration::from_millis),
                device,
            };
            runtime.block_on(run_send(&config, request))
        }
    }
}

fn run_encode(
    config: &Config,
    opcode: u8,
    args: &[u8],
    packet: u32,
    chunk_size: Option<usize>,
) -> Result<()> {
    let mut frame = Vec::new();
    config
        .session
        .protocol
        .codec()
        .encode(opcode, args, packet, &mut frame)?;
    println!("{}", to_hex(&frame));

    if let Some(max) = chunk_size {
        for (i, chunk) in chunks(&frame, max).iter().enumerate() {
            println!("chunk {}: {}", i, to_hex(chunk));
        }
    }
    Ok(())
}

fn run_decode(config: &Config, raw: &[u8]) -> Result<()> {
    let notification = config.session.protocol.codec().decode(raw)?;
    print_notification(&notification);
    Ok(())
}

fn print_notification(notification: &Notification) {
    println!("opcode:   {:#04x}", notification.opcode);
    if let Some(packet) = notification.packet_number {
        println!("packet:   {}", packet);
    }
    println!("length:   {}", notification.declared_len);
    println!("payload:  {}", to_hex(&notification.payload));
    println!(
        "checksum: {:#06x} ({})",
        notification.checksum,
        if notification.checksum_valid() {
            "ok"
        } else {
            "mismatch"
        }
    );
}

fn run_sprite(config: &Config, file: &Path, part_size: Option<usize>) -> Result<()> {
    let session = config.to_session_config();
    let commands = match sprite::load(file)? {
        Sprite::Still(raster) => {
            raster.ensure_square(session.panel_size)?;
            let payload = pixel::encode_static(&raster)?;
            vec![commands::show_image(&pixel::static_part(&payload)?)]
        }
        Sprite::Animated(animation) => {
            for frame in animation.frames() {
                frame.raster.ensure_square(session.panel_size)?;
            }
            let frames = pixel::encode_animation(&animation)?;
            let part_size = part_size.unwrap_or(session.frame_part_size);
            pixel::animation_parts(&frames, part_size)?
                .iter()
                .map(commands::animation_part)
                .collect()
        }
    };

    for command in &commands {
        let mut frame = Vec::new();
        session
            .protocol
            .codec()
            .encode(command.opcode, &command.args, 0, &mut frame)?;
        println!("{}", to_hex(&frame));
    }
    Ok(())
}

struct SendRequest {
    command: DeviceCommand,
    wait: bool,
    reply: Option<HexBytes>,
    timeout: Option<Duration>,
    device: Option<String>,
}

async fn run_send(config: &Config, request: SendRequest) -> Result<()> {
    let mut session_config = config.to_session_config();
    let mut cache = match &request.device {
        Some(_) => Some(CharacteristicCache::load(&config.cache.path)?),
        None => None,
    };
    if let (Some(cache), Some(device)) = (&cache, &request.device) {
        apply_cached_endpoints(&mut session_config, cache, device);
    }

    let device = MemoryTransport::standard();
    if let Some(reply) = request.reply {
        let reply = reply.0;
        device.set_responder(move |_| Some(reply.clone()));
    }

    let session = CommandSession::open(device.clone(), session_config).await?;
    let result = if request.wait {
        let timeout = request
            .timeout
            .unwrap_or(session.config().response_timeout);
        session
            .send_and_wait(&request.command, timeout)
            .await
            .map(Some)
    } else {
        session.send(&request.command).await.map(|()| None)
    };

    for (i, (uuid, data)) in device.writes().iter().enumerate() {
        println!("write {} -> {}: {}", i, uuid, to_hex(data));
    }

    if let (Some(cache), Some(id)) = (&mut cache, &request.device) {
        cache.record(id, session.endpoints(), session.readable_characteristics());
        if let Err(e) = cache.save() {
            warn!("Could not save characteristic cache: {}", e);
        }
    }

    let stats = session.stats();
    debug!(
        "tx {} bytes in {} frames, {} notifications",
        stats.tx_bytes, stats.frames_sent, stats.notifications
    );
    session.close().await?;

    if let Some(payload) = result? {
        println!("response: {}", to_hex(&payload));
    }
    Ok(())
}

/// Fill unset endpoints from the cache entry for `device`
fn apply_cached_endpoints(config: &mut SessionConfig, cache: &CharacteristicCache, device: &str) {
    let Some(cached) = cache.get(device) else {
        return;
    };
    debug!("Using cached characteristics for {}", device);
    if config.write_characteristic.is_none() {
        config.write_characteristic = Some(cached.write.clone());
    }
    if config.notify_characteristic.is_none() {
        config.notify_characteristic = Some(cached.notify.clone());
    }
}
