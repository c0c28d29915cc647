//! Download the full glucose history from an attached receiver.
//!
//! Run with:
//!
//! ```sh
//! cargo run --example download_history
//! ```

use dexlink::{find_receiver_port, DeviceSession, GlucoseReading, Record, RecordType, SerialTransport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let port = find_receiver_port()?
        .ok_or_else(|| anyhow::anyhow!("no Dexcom receiver found on any serial port"))?;
    println!("receiver on {port}");

    let transport = SerialTransport::open(&port).await?;
    let mut session = DeviceSession::new(Box::new(transport));

    let identity = session.resolve().await?;
    println!(
        "{} receiver, firmware {}, S/N {}",
        identity.generation,
        identity.firmware_version,
        identity.serial_number.as_deref().unwrap_or("unknown")
    );

    let records = session.read_all_records(RecordType::EgvData).await?;
    println!("{} EGV records", records.len());

    for record in records.iter().rev().take(12) {
        let (seconds, glucose) = match record {
            Record::Egv(r) => (r.system_seconds, r.glucose),
            Record::EgvG6(r) => (r.system_seconds, r.glucose),
            _ => continue,
        };
        match glucose {
            GlucoseReading::Value(mg_dl) => println!("t+{seconds}s  {mg_dl} mg/dL"),
            sentinel => println!("t+{seconds}s  {sentinel:?}"),
        }
    }

    session.close().await?;
    Ok(())
}
