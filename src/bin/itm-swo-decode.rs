use anyhow::{bail, Context, Result};
use itm_swo::{
    Decoder, DecoderError, DecoderOptions, DwtEvent, GlobalTimestampWidth, ReadSource,
    TracePacket,
};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

#[derive(StructOpt, Debug)]
#[structopt(
    about = "An ITM/DWT packet protocol decoder for trace data captured from the SWO pin, as specified in the ARMv7-M architecture reference manual, Appendix D4. See <https://developer.arm.com/documentation/ddi0403/ed/>."
)]
struct Opt {
    #[structopt(
        short = "-F",
        long = "--follow",
        help = "Keep reading after end of file, as when the trace is still being captured"
    )]
    follow: bool,

    #[structopt(
        long = "--gts-width",
        default_value = "48",
        help = "Width of the target's global timestamp counter (48 or 64)"
    )]
    gts_width: u8,

    #[structopt(
        short = "-s",
        long = "--stimulus",
        help = "Only write the raw payload of instrumentation packets on this stimulus port to stdout"
    )]
    stimulus: Option<u8>,

    #[structopt(long = "--dwt", help = "Interpret hardware source packets as DWT events")]
    dwt: bool,

    #[structopt(long = "--stop-on-error", help = "Exit on the first malformed packet")]
    stop_on_error: bool,

    #[structopt(
        name = "FILE",
        parse(from_os_str),
        help = "Raw trace input file. Reads from stdin if omitted."
    )]
    file: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let opt = Opt::from_args();

    let options = DecoderOptions {
        gts_width: match opt.gts_width {
            48 => GlobalTimestampWidth::Bits48,
            64 => GlobalTimestampWidth::Bits64,
            n => bail!(
                "{} is not a valid global timestamp width; valid widths are: 48, 64.",
                n
            ),
        },
    };
    if let Some(port) = opt.stimulus {
        if port > 31 {
            bail!("{} is not a valid stimulus port; valid ports are 0-31.", port);
        }
    }

    let input: Box<dyn Read> = match &opt.file {
        Some(path) => Box::new(
            File::open(path).with_context(|| format!("Failed to open {:?}", path))?,
        ),
        None => Box::new(io::stdin()),
    };
    let mut decoder = Decoder::with_source(ReadSource::new(input, opt.follow), options);

    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    loop {
        match decoder.pull() {
            Ok(Some(packet)) => print_packet(&mut stdout, &opt, &packet)?,
            Ok(None) if decoder.is_exhausted() => return Ok(()), // EOF
            Ok(None) => thread::sleep(Duration::from_millis(100)),
            Err(DecoderError::MalformedPacket(fault)) if !opt.stop_on_error => {
                eprintln!("Error: {}", fault);
            }
            Err(e) => return Err(e).context("Decoder error"),
        }
    }
}

fn print_packet(out: &mut impl Write, opt: &Opt, packet: &TracePacket) -> Result<()> {
    match (opt.stimulus, packet) {
        (Some(port), TracePacket::Instrumentation { port: p, payload, .. }) if *p == port => {
            out.write_all(payload)?;
            out.flush()?;
        }
        (Some(_), _) => {}
        (
            None,
            TracePacket::HardwareSource {
                disc_id, payload, ..
            },
        ) if opt.dwt => match DwtEvent::decode(*disc_id, payload) {
            Ok(event) => writeln!(out, "{:?}", event)?,
            Err(e) if opt.stop_on_error => return Err(e).context("Malformed DWT packet"),
            Err(e) => eprintln!("Error: {}", e),
        },
        (None, _) => writeln!(out, "{:?}", packet)?,
    }

    Ok(())
}
