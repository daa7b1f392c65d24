use clap::Args;
use focuscycle_core::cycle::{focus_count, total_duration_secs, total_focus_seconds};
use focuscycle_core::{generate_phases, Config};

use super::format_secs;

#[derive(Args)]
pub struct PhasesArgs {
    /// Estimated task length in minutes
    pub minutes: u32,
    /// Override the configured focus length
    #[arg(long)]
    pub work: Option<u32>,
    /// Override the configured short break length
    #[arg(long = "break")]
    pub break_minutes: Option<u32>,
    /// Override how many focus phases come before a long break
    #[arg(long)]
    pub every: Option<u32>,
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: PhasesArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = Config::load()?.cycle;
    if let Some(work) = args.work {
        settings.work_minutes = work;
    }
    if let Some(minutes) = args.break_minutes {
        settings.break_minutes = minutes;
    }
    if let Some(every) = args.every {
        settings.long_break_every = every;
    }
    settings.validate()?;

    let phases = generate_phases(args.minutes, &settings);
    if phases.is_empty() {
        return Err(format!(
            "{} minutes is shorter than the minimum focus phase of {} minutes",
            args.minutes, settings.min_focus_tail_minutes
        )
        .into());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&phases)?);
        return Ok(());
    }

    println!("{:>3}  {:<12} {:>8}", "#", "type", "length");
    for (i, phase) in phases.iter().enumerate() {
        println!(
            "{:>3}  {:<12} {:>8}",
            i + 1,
            phase.phase_type,
            format_secs(u64::from(phase.duration_secs))
        );
    }
    println!(
        "total {} ({} focus in {} phases)",
        format_secs(total_duration_secs(&phases)),
        format_secs(total_focus_seconds(&phases)),
        focus_count(&phases)
    );
    Ok(())
}
