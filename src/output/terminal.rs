// Colored terminal output for classification runs, reports and sweeps.
//
// All terminal-specific formatting lives here; main.rs delegates.

use colored::Colorize;

use crate::classifier::summary::LabelDistribution;
use crate::classifier::{ComponentSummary, Label};
use crate::db::models::StoredClassification;
use crate::topics::{CoherenceRecord, TopicSelection};

/// Width of the coherence bar chart, in characters.
const BAR_WIDTH: usize = 40;

/// Label distribution after a classify or rescore run.
pub fn display_distribution(dist: &LabelDistribution) {
    println!(
        "\n{}",
        format!("=== Classification ({} comments) ===", dist.total).bold()
    );
    println!();

    for count in &dist.counts {
        println!(
            "  {:<10} {:>7}  {:>5.1}%",
            colorize_label(count.label),
            count.count,
            count.percent,
        );
    }
    println!();
    println!(
        "  Mean confidence: {:.3}  |  Uncertainty rate: {:.1}%",
        dist.mean_confidence,
        dist.uncertainty_rate * 100.0
    );
}

/// Per-component statistics of a fitted model.
pub fn display_components(components: &[ComponentSummary]) {
    println!("\n{}", "=== Clusters ===".bold());
    println!();
    println!(
        "  {:>3}  {:<10} {:>6} {:>7} {:>6} {:>6} {:>7} {:>7} {:>6}",
        "#".dimmed(),
        "Label".dimmed(),
        "Size".dimmed(),
        "Weight".dimmed(),
        "Caps".dimmed(),
        "Emoji".dimmed(),
        "Length".dimmed(),
        "Generic".dimmed(),
        "Spam".dimmed(),
    );
    println!("  {}", "-".repeat(70).dimmed());

    for c in components {
        println!(
            "  {:>3}  {:<10} {:>6} {:>7.3} {:>6.3} {:>6.3} {:>7.1} {:>6.1}% {:>6.2}",
            c.index,
            colorize_label(c.label),
            c.size,
            c.weight,
            c.mean.caps_ratio,
            c.mean.emoji_ratio,
            c.mean.length_chars,
            c.mean.is_generic * 100.0,
            c.spam_likelihood,
        );
    }
}

/// Top samples for one label.
pub fn display_samples(label: Label, samples: &[StoredClassification]) {
    println!(
        "\n{}",
        format!("=== Top {} samples ({}) ===", label, samples.len()).bold()
    );
    if samples.is_empty() {
        println!("  none");
        return;
    }
    for (i, s) in samples.iter().enumerate() {
        println!(
            "  {:>2}. [{:.3}] {}",
            i + 1,
            s.confidence,
            super::truncate_chars(&s.text, 100).dimmed()
        );
    }
}

/// Lowest-confidence comments, for manual review.
pub fn display_review_candidates(samples: &[StoredClassification]) {
    println!(
        "\n{}",
        format!("=== Review candidates ({}) ===", samples.len()).bold()
    );
    for s in samples {
        let leaning = s
            .leaning
            .map(|l| format!(" leaning {l}"))
            .unwrap_or_default();
        println!(
            "  [{:.3} margin {:.3}] {}{}  {}",
            s.confidence,
            s.margin,
            colorize_label(s.label),
            leaning.dimmed(),
            super::truncate_chars(&s.text, 80).dimmed()
        );
    }
}

/// Horizontal bar chart of a coherence sweep with the optimum marked.
pub fn display_coherence_chart(records: &[CoherenceRecord], selection: &TopicSelection) {
    println!("\n{}", "=== Topic coherence by K ===".bold());
    println!();

    let (min, max) = records.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
        (lo.min(r.coherence_score), hi.max(r.coherence_score))
    });
    let span = (max - min).max(f64::EPSILON);

    for r in records {
        // Leave a stub bar for the minimum so every K stays visible.
        let filled = 1 + (((r.coherence_score - min) / span) * (BAR_WIDTH - 1) as f64).round() as usize;
        let bar = "#".repeat(filled.min(BAR_WIDTH));
        if r.k == selection.k {
            println!(
                "  K={:>3}  {:<width$}  {:.3}  {}",
                r.k,
                bar.green().bold(),
                r.coherence_score,
                "<- optimal".green(),
                width = BAR_WIDTH
            );
        } else {
            println!(
                "  K={:>3}  {:<width$}  {:.3}",
                r.k,
                bar.dimmed(),
                r.coherence_score,
                width = BAR_WIDTH
            );
        }
    }
    println!();
    display_selection(selection);
}

pub fn display_selection(selection: &TopicSelection) {
    println!(
        "  Optimal K: {} (coherence {:.3})",
        selection.k.to_string().bold(),
        selection.coherence_score
    );
    match selection.improvement {
        Some(gain) => println!("  Improvement over smaller K: {:+.4}", gain),
        None => println!("  Improvement over smaller K: n/a (smallest K in sweep)"),
    }
    if selection.marginal {
        println!(
            "  {} marginal optimum: the gain over smaller K is below the configured minimum",
            "~".yellow()
        );
    }
}

/// Colorize a label.
pub fn colorize_label(label: Label) -> colored::ColoredString {
    match label {
        Label::Spam => label.as_str().red().bold(),
        Label::Uncertain => label.as_str().yellow(),
        Label::Quality => label.as_str().green(),
    }
}
