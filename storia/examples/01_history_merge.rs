use std::sync::Arc;

use storia::{AttachParams, FieldMask, HistoryBuilder, Period};
use storia_mock::MockDriver;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // 1. Two sources with overlapping coverage. The exchange feed is
    // attached first, so it wins wherever both supply the same instant.
    let exchange = Arc::new(MockDriver::daily(
        "exchange",
        &[(1, 101.0), (2, 102.0), (3, 103.0), (4, 104.0), (5, 105.0)],
    ));
    let vendor = Arc::new(MockDriver::daily(
        "vendor",
        &[(3, 903.0), (4, 904.0), (5, 905.0), (6, 106.0), (7, 107.0)],
    ));

    // 2. Attach both and build.
    let mut builder = HistoryBuilder::new();
    builder.attach_source(
        exchange,
        AttachParams::new(Period::Daily, FieldMask::PRICE),
    )?;
    builder.attach_source(vendor, AttachParams::new(Period::Daily, FieldMask::PRICE))?;

    let history = builder.build().await?;

    // 3. Days 3-5 resolve to the exchange's values; the vendor fills the
    // tail the exchange never saw.
    println!("merged history ({} bars):", history.nb_bars());
    for (ts, close) in history.timestamp.iter().zip(&history.close) {
        println!(" - ts {} close {close:.2}", ts.timestamp());
    }

    Ok(())
}
