use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;

use delayend_game::{AggregateSummary, Ending};

const REBELLION_TARGET_MIN: f64 = 0.05;
const REBELLION_TARGET_MAX: f64 = 0.15;
const FALSE_PEACE_MAX: f64 = 0.70;
const FALSE_PEACE_MIN: f64 = 0.25;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReportFormat {
    /// Styled console report with tuning suggestions
    Console,
    /// Machine-readable summary JSON
    Json,
    /// Markdown tables for docs and issues
    Markdown,
}

pub fn render(summary: &AggregateSummary, format: ReportFormat) -> Result<()> {
    match format {
        ReportFormat::Console => generate_console_report(summary),
        ReportFormat::Json => generate_json_report(summary)?,
        ReportFormat::Markdown => generate_markdown_report(summary),
    }
    Ok(())
}

fn probability(summary: &AggregateSummary, ending: Ending) -> f64 {
    summary
        .ending_probabilities
        .get(&ending)
        .copied()
        .unwrap_or(0.0)
}

fn generate_console_report(summary: &AggregateSummary) {
    println!();
    println!("{}", "===== Monte Carlo Report =====".bright_cyan().bold());
    println!("Runs: {}", summary.n_runs);

    println!("\n{}", "[Ending Probabilities]".bold());
    for ending in Ending::ALL {
        let p = probability(summary, ending);
        println!("  {:18}: {:6.2}%", ending.as_str(), p * 100.0);
    }

    println!("\n{}", "[Extreme Intervention Count Distribution]".bold());
    for (count, p) in &summary.extreme_count_distribution {
        println!("  extreme={count}: {:6.2}%", p * 100.0);
    }
    println!("  mean: {:.2}", summary.avg_extreme_count);

    println!("\n{}", "[Final State Means]".bold());
    println!("  Heaven   : {:.2}", summary.avg_final_heaven);
    println!("  Hell     : {:.2}", summary.avg_final_hell);
    println!("  Stability: {:.2}", summary.avg_final_stability);
    println!("  Pressure : {:.2}", summary.avg_final_pressure);

    println!("\n{}", "[Hidden Path Indicator]".bold());
    println!(
        "  Rebellion flag rate (pre-final check): {:.2}%",
        summary.rebellion_flag_rate_before_final_check * 100.0
    );

    println!("\n{}", "[Tuning Suggestions]".bright_yellow().bold());
    for suggestion in tuning_suggestions(summary) {
        println!("  - {suggestion}");
    }
}

fn generate_json_report(summary: &AggregateSummary) -> Result<()> {
    let json_output = serde_json::to_string_pretty(summary)?;
    println!("{json_output}");
    Ok(())
}

fn generate_markdown_report(summary: &AggregateSummary) {
    println!("# Delay the End Balance Report\n");
    println!("- **Runs**: {}", summary.n_runs);
    println!(
        "- **Rebellion flag rate (pre-final check)**: {:.2}%\n",
        summary.rebellion_flag_rate_before_final_check * 100.0
    );

    println!("## Ending Probabilities\n");
    println!("| Ending | Probability |");
    println!("| --- | --- |");
    for ending in Ending::ALL {
        println!(
            "| {} | {:.2}% |",
            ending.as_str(),
            probability(summary, ending) * 100.0
        );
    }

    println!("\n## Extreme Intervention Counts\n");
    println!("| Count | Probability |");
    println!("| --- | --- |");
    for (count, p) in &summary.extreme_count_distribution {
        println!("| {count} | {:.2}% |", p * 100.0);
    }
    println!("\nMean extreme count: {:.2}", summary.avg_extreme_count);

    println!("\n## Final State Means\n");
    println!("| Resource | Mean |");
    println!("| --- | --- |");
    println!("| Heaven | {:.2} |", summary.avg_final_heaven);
    println!("| Hell | {:.2} |", summary.avg_final_hell);
    println!("| Stability | {:.2} |", summary.avg_final_stability);
    println!("| Pressure | {:.2} |", summary.avg_final_pressure);

    println!("\n## Tuning Suggestions\n");
    for suggestion in tuning_suggestions(summary) {
        println!("- {suggestion}");
    }
}

fn tuning_suggestions(summary: &AggregateSummary) -> Vec<String> {
    let rebellion = probability(summary, Ending::HumanRebellion);
    let false_peace = probability(summary, Ending::FalsePeace);
    let mut suggestions = Vec::new();

    if rebellion < REBELLION_TARGET_MIN {
        suggestions.push(String::from(
            "Human Rebellion too rare: relax the pressure ceiling (e.g. < 88) or soften the balance window.",
        ));
    } else if rebellion > REBELLION_TARGET_MAX {
        suggestions.push(String::from(
            "Human Rebellion too common: tighten the pressure ceiling (e.g. < 80) or make extreme choices more tempting.",
        ));
    } else {
        suggestions.push(String::from(
            "Human Rebellion sits inside the 5%-15% target band.",
        ));
    }

    if false_peace > FALSE_PEACE_MAX {
        suggestions.push(String::from(
            "False Peace too dominant: add late-game swing events or sharpen the ending thresholds.",
        ));
    } else if false_peace < FALSE_PEACE_MIN {
        suggestions.push(String::from(
            "False Peace too rare: first runs may feel harsh; consider making it the common fallback again.",
        ));
    } else {
        suggestions.push(String::from("False Peace share looks reasonable."));
    }

    suggestions
}
