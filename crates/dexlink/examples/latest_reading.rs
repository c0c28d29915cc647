//! Poll the most recent glucose reading without downloading the history.
//!
//! Uses the reverse pager: newest page first, newest record first, stopping
//! as soon as a real (non-sentinel) reading appears.

use dexlink::{find_receiver_port, DeviceSession, Record, RecordType, SerialTransport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let port = find_receiver_port()?
        .ok_or_else(|| anyhow::anyhow!("no Dexcom receiver found on any serial port"))?;
    let transport = SerialTransport::open(&port).await?;
    let session = DeviceSession::new(Box::new(transport));

    let mut pager = session.records_newest_first(RecordType::EgvData).await?;
    while let Some(page) = pager.next_page().await? {
        for record in page {
            let glucose = match &record {
                Record::Egv(r) => r.glucose,
                Record::EgvG6(r) => r.glucose,
                _ => continue,
            };
            if let Some(mg_dl) = glucose.mg_dl() {
                println!("latest reading: {mg_dl} mg/dL");
                session.close().await?;
                return Ok(());
            }
        }
    }

    println!("no numeric reading on device");
    session.close().await?;
    Ok(())
}
