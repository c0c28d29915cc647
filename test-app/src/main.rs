// dexlink test application -- CLI tool for exercising a real Dexcom
// G4/G5/G6 receiver over its USB-serial link.
//
// Usage:
//   dexlink-test-app discover
//   dexlink-test-app info
//   dexlink-test-app --port /dev/ttyACM0 info
//   dexlink-test-app ping
//   dexlink-test-app battery
//   dexlink-test-app records egv
//   dexlink-test-app dump egv --limit 20

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use dexlink::{
    find_receiver_port, DeviceSession, GlucoseReading, Record, RecordType, SerialTransport,
};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// dexlink test application -- exercises a receiver from the command line.
#[derive(Parser)]
#[command(name = "dexlink-test-app", version, about)]
struct Cli {
    /// Serial port path (e.g. /dev/ttyACM0, COM3). Auto-discovered by USB
    /// vendor/product id when omitted.
    #[arg(long)]
    port: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enumerate serial ports and report the receiver's, if attached.
    Discover,
    /// Identify the receiver: generation, firmware, serial, transmitter.
    Info,
    /// Send a PING and report whether the receiver ACKed.
    Ping,
    /// Report battery level and charging state.
    Battery,
    /// Count the records stored for one record type.
    Records {
        /// Record type to count.
        #[arg(value_enum)]
        kind: RecordKind,
    },
    /// Print the newest records of one record type.
    Dump {
        /// Record type to dump.
        #[arg(value_enum)]
        kind: RecordKind,
        /// Maximum number of records to print.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

/// Record types addressable from the command line.
#[derive(Clone, Copy, ValueEnum)]
enum RecordKind {
    Egv,
    Sensor,
    Meter,
    Calibration,
    Event,
    Insertion,
    Settings,
}

impl From<RecordKind> for RecordType {
    fn from(kind: RecordKind) -> RecordType {
        match kind {
            RecordKind::Egv => RecordType::EgvData,
            RecordKind::Sensor => RecordType::SensorData,
            RecordKind::Meter => RecordType::MeterData,
            RecordKind::Calibration => RecordType::CalSet,
            RecordKind::Event => RecordType::UserEventData,
            RecordKind::Insertion => RecordType::InsertionTime,
            RecordKind::Settings => RecordType::UserSettingData,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    if matches!(&cli.command, Command::Discover) {
        return discover();
    }

    let port = match &cli.port {
        Some(port) => port.clone(),
        None => find_receiver_port()?
            .context("no Dexcom receiver found; is the cradle plugged in?")?,
    };
    let transport = SerialTransport::open(&port).await?;
    let mut session = DeviceSession::new(Box::new(transport));

    let result = run_command(&cli.command, &mut session).await;
    session.close().await.ok();
    result
}

fn discover() -> Result<()> {
    match find_receiver_port()? {
        Some(port) => println!("receiver found on {port}"),
        None => println!("no receiver attached"),
    }
    Ok(())
}

async fn run_command(command: &Command, session: &mut DeviceSession) -> Result<()> {
    match command {
        Command::Discover => unreachable!("handled before connecting"),
        Command::Info => info(session).await,
        Command::Ping => {
            if session.ping().await? {
                println!("receiver ACKed");
                Ok(())
            } else {
                bail!("receiver answered, but not with ACK");
            }
        }
        Command::Battery => {
            let level = session.battery_level().await?;
            let state = session.battery_state().await?;
            println!("battery: {level}% ({state:?})");
            Ok(())
        }
        Command::Records { kind } => {
            let record_type: RecordType = (*kind).into();
            let records = session.read_all_records(record_type).await?;
            println!("{record_type}: {} records", records.len());
            Ok(())
        }
        Command::Dump { kind, limit } => dump(session, (*kind).into(), *limit).await,
    }
}

async fn info(session: &mut DeviceSession) -> Result<()> {
    let identity = session.resolve().await?;
    println!("generation : {}", identity.generation);
    println!("firmware   : {}", identity.firmware_version);
    println!(
        "serial     : {}",
        identity.serial_number.as_deref().unwrap_or("unknown")
    );
    println!("transmitter: {}", session.transmitter_id().await?);
    println!(
        "battery    : {}% ({:?})",
        session.battery_level().await?,
        session.battery_state().await?
    );
    println!("unit       : {}", session.glucose_unit().await?);

    for record_type in [
        RecordType::MeterData,
        RecordType::EgvData,
        RecordType::UserEventData,
        RecordType::InsertionTime,
        RecordType::CalSet,
    ] {
        let records = session.read_all_records(record_type).await?;
        println!("{record_type}: {} records", records.len());
    }
    if identity.generation.has_user_settings() {
        let records = session.read_all_records(RecordType::UserSettingData).await?;
        println!("{}: {} records", RecordType::UserSettingData, records.len());
    }
    Ok(())
}

async fn dump(session: &DeviceSession, record_type: RecordType, limit: usize) -> Result<()> {
    let mut printed = 0;
    let mut pager = session.records_newest_first(record_type).await?;
    while printed < limit {
        let Some(page) = pager.next_page().await? else {
            break;
        };
        for record in page {
            if printed >= limit {
                break;
            }
            print_record(&record);
            printed += 1;
        }
    }
    if printed == 0 {
        println!("{record_type}: no records");
    }
    Ok(())
}

fn print_record(record: &Record) {
    let t = record
        .system_seconds()
        .map(|s| format!("t+{s}s"))
        .unwrap_or_else(|| "-".to_string());
    match record {
        Record::Egv(r) => println!("{t}  egv {}  trend {:?}", glucose(&r.glucose), r.trend),
        Record::EgvG6(r) => println!(
            "{t}  egv {}  trend {:?}  test #{}",
            glucose(&r.glucose),
            r.trend,
            r.test_number
        ),
        Record::Sensor(r) => println!(
            "{t}  sensor unfiltered {} filtered {} rssi {}",
            r.unfiltered, r.filtered, r.rssi
        ),
        Record::Event(r) => println!(
            "{t}  event type {}/{} value {}",
            r.event_type, r.event_sub_type, r.event_value
        ),
        Record::Insertion(r) => {
            println!("{t}  insertion at t+{}s state {}", r.insertion_seconds, r.session_state)
        }
        Record::InsertionG5(r) => println!(
            "{t}  insertion at t+{}s state {} transmitter {}",
            r.insertion_seconds, r.session_state, r.transmitter_serial
        ),
        Record::Meter(r) => println!("{t}  meter {} mg/dL", r.meter_glucose),
        Record::MeterG5(r) => println!(
            "{t}  meter {} mg/dL  test #{}",
            r.meter_glucose, r.test_number
        ),
        Record::CalibrationLegacy(r) => {
            println!("{t}  calibration {} mg/dL", r.calibration_glucose)
        }
        Record::Calibration(r) => println!(
            "{t}  calibration {} mg/dL subtype {}",
            r.calibration_glucose, r.record_subtype
        ),
        Record::UserSettingsG5(r) => println!(
            "{t}  settings high {} low {} sounds {}",
            r.high_alert, r.low_alert, r.sounds_type
        ),
        Record::UserSettingsG6(r) => println!(
            "{t}  settings high {} low {} sensor code {}",
            r.high_alert, r.low_alert, r.sensor_code
        ),
        Record::Xml(r) => println!("{t}  xml {}", r.fragment.as_str()),
    }
}

fn glucose(reading: &GlucoseReading) -> String {
    match reading.mg_dl() {
        Some(mg_dl) => format!("{mg_dl} mg/dL"),
        None => format!("{reading:?}"),
    }
}
