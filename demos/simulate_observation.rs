use chrono::Local;
use delaycomp::{
    DelayCompError,
    base::{Epoch, ObservationSettings, SkyDirection},
    coords::{J2000Converter, parse_dec, parse_ra},
    engine::{DelayCalculator, EngineSettingsBuilder},
    pipeline::{BeamletForwarder, MemoryBeamletBuffer, OutgoingBlock},
};
use env_logger::Builder;
use log::info;
use std::{env, io::prelude::*};

const NR_BLOCKS: u64 = 32;

fn main() -> Result<(), DelayCompError> {
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%dT%H:%M:%S.%f"),
                record.level(),
                record.args()
            )
        })
        .filter(None, log::LevelFilter::Info)
        .init();

    let station = env::args().nth(1).unwrap_or_else(|| "DE601".to_string());

    let mut settings = ObservationSettings::from_json_file(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/demos/observation.json"
    ))?;

    // Point the second SAP at Cas A.
    settings.saps[1].direction = SkyDirection::j2000(parse_ra("23:23:24.0")?, parse_dec("+58:48:54")?);

    let calculator = DelayCalculator::new(&settings, &station, J2000Converter::new())?;

    let engine = EngineSettingsBuilder::default()
        .batch_size(8)
        .capacity(32)
        .build()
        .expect("engine settings are complete");

    // A complex tone per subband, stored with enough margin for coarse shifts of up to ~0.1 s.
    let margin = (0.1 * settings.subband_sample_rate) as i64;
    let nr_samples = (NR_BLOCKS * settings.block_size) as usize + 2 * margin as usize;

    let source = MemoryBeamletBuffer::from_fn(
        settings.subband_to_sap.len(),
        -margin,
        nr_samples,
        |subband, idx| {
            let phase = 0.01 * (subband + 1) as f64 * idx as f64;

            ((1000.0 * phase.cos()) as i16, (1000.0 * phase.sin()) as i16)
        },
    );

    let mut forwarder = BeamletForwarder::new(
        &settings,
        calculator,
        engine,
        Epoch::new(0),
        source,
        Vec::<OutgoingBlock<(i16, i16)>>::new(),
    )?;

    forwarder.run(NR_BLOCKS)?;

    for block in forwarder.sink().iter().step_by(8) {
        for subband in block.subbands.iter() {
            info!(
                "epoch {:>8} subband {} read offset {:>6} station beam fine delay {:+.3e} .. {:+.3e} s",
                block.epoch,
                subband.subband,
                subband.read_offset,
                subband.fine_delays[0].delay_at_begin,
                subband.fine_delays[0].delay_after_end
            );
        }
    }

    let stats = forwarder.shutdown()?;

    info!("{stats}");

    Ok(())
}
