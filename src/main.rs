use std::{env, path::Path};

use anyhow::{bail, ensure, Context};
use itertools::Itertools;
use skintrack::{
    color::{ColorConverter, StandardConverter},
    grid::{ColorImage, Mask},
    report::LogReporter,
    skin::{ModelKind, SkinHistogram, SkinModels},
    timer::{FpsCounter, Timer},
    track::Tracker,
};

const USAGE: &str = "usage:
  skintrack train <out> <dims> <bins>... <ranges>... -- <image> <mask> [<image> <mask>...]
  skintrack track <hue.hist> <crcb.hist> <rgb.hist> <frame>...";

fn main() -> anyhow::Result<()> {
    skintrack::init_logger!();

    let args = env::args().skip(1).collect::<Vec<_>>();
    match args.split_first() {
        Some((cmd, rest)) if cmd == "train" => train(rest),
        Some((cmd, rest)) if cmd == "track" => track(rest),
        _ => bail!("{USAGE}"),
    }
}

fn train(args: &[String]) -> anyhow::Result<()> {
    let Some(sep) = args.iter().position(|a| a == "--") else {
        bail!("missing `--` before the training pairs\n{USAGE}");
    };
    let (params, pairs) = (&args[..sep], &args[sep + 1..]);
    let Some((out, params)) = params.split_first() else { bail!("{USAGE}") };
    let Some((dims, params)) = params.split_first() else { bail!("{USAGE}") };
    let dims: usize = dims.parse().with_context(|| format!("invalid dimension count `{dims}`"))?;
    ensure!(
        params.len() == 2 * dims,
        "expected {dims} bin counts and {dims} ranges, got {} values",
        params.len()
    );
    ensure!(
        !pairs.is_empty() && pairs.len() % 2 == 0,
        "training pairs must be given as `<image> <mask>`"
    );

    let numbers = params
        .iter()
        .map(|p| p.parse::<usize>().with_context(|| format!("invalid number `{p}`")))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let (bins, ranges) = numbers.split_at(dims);
    let axes = bins.iter().copied().zip(ranges.iter().copied()).collect::<Vec<_>>();
    let mut hist = SkinHistogram::with_axes(&axes)?;

    let kind = match dims {
        1 => ModelKind::Hue,
        2 => ModelKind::CrCb,
        _ => ModelKind::Rgb,
    };
    let converter = StandardConverter;
    let t_load = Timer::new("load");
    let mut samples = Vec::new();
    for (image, mask) in pairs.iter().tuples() {
        let _guard = t_load.start();
        let frame = ColorImage::load(image).with_context(|| format!("failed to load `{image}`"))?;
        let mask = Mask::load(mask).with_context(|| format!("failed to load `{mask}`"))?;
        samples.push((converter.convert(&frame, kind.color_space()), mask));
    }

    let used = hist.train_batch(samples.iter().map(|(image, mask)| (image, mask)));
    hist.normalize();
    log::info!("trained on {used}/{} pairs ({t_load})", samples.len());
    hist.save(out)
        .with_context(|| format!("failed to save histogram to `{out}`"))?;
    Ok(())
}

fn track(args: &[String]) -> anyhow::Result<()> {
    let [hue, crcb, rgb, frames @ ..] = args else { bail!("{USAGE}") };
    let models = SkinModels::load(hue, crcb, rgb).context("failed to load skin models")?;
    let mut tracker = Tracker::new(models);
    tracker.set_reporter(LogReporter);

    let mut fps = FpsCounter::new("tracker");
    for path in frames {
        let frame = ColorImage::load(Path::new(path))
            .with_context(|| format!("failed to load frame `{path}`"))?;
        for target in tracker.track(&frame) {
            log::info!(
                "{path}: {} {:?} position=({:.3}, {:.3}) scale={:.3}",
                target.id(),
                target.kind(),
                target.position().x,
                target.position().y,
                target.scale(),
            );
        }
        fps.tick_with(tracker.timers());
    }
    Ok(())
}
