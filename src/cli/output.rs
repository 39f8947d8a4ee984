//! Terminal rendering of command results.

use console::style;

use crate::models::{CompressOutcome, ProcessOutcome, ProgressSnapshot};
use crate::services::{HookOutcome, PreviewWindow, ScanReport, ServiceCheck};

pub fn failure(message: &str) {
    println!("{} {}", style("❌").red(), style(message).red());
}

pub fn warning(message: &str) {
    println!("{} {}", style("⚠️").yellow(), style(message).yellow());
}

pub fn service_check(check: &ServiceCheck) {
    match check {
        ServiceCheck::Available { os } => {
            let os = os.as_deref().unwrap_or("unknown");
            println!(
                "{} Scanner service available ({})",
                style("✅").green(),
                style(os).bold()
            );
        }
        ServiceCheck::Unavailable => {
            failure("Scanner service is not available. Start the scanner service and try again.")
        }
        ServiceCheck::Error(e) => failure(&format!("Could not reach the scanning service: {}", e)),
    }
}

pub fn scan_report(report: &ScanReport, duplex: bool) {
    let outcome = &report.outcome;
    let mut headline = format!("Scan complete: {}", outcome.archivo);
    if let Some(pages) = outcome.num_paginas {
        headline.push_str(&format!(" ({} pages", pages));
        if duplex && report.kind.uses_feeder() {
            headline.push_str(", duplex");
        }
        headline.push(')');
    }
    println!("{} {}", style("✅").green(), style(headline).bold());

    if !outcome.mensaje.is_empty() {
        println!("   {}", outcome.mensaje);
    }

    if report.kind.runs_ocr() {
        ocr_summary(report);
    }

    for run in &report.hooks {
        match &run.result {
            Ok(HookOutcome::Compressed(compressed)) => compression(compressed),
            Ok(HookOutcome::PreviewOpened(window)) => preview(window),
            Ok(HookOutcome::Skipped(reason)) => {
                println!("   {} {}: {}", style("-").dim(), run.hook, style(reason).dim());
            }
            Err(e) => warning(&format!("{} failed: {}", run.hook, e)),
        }
    }
}

fn ocr_summary(report: &ScanReport) {
    let outcome = &report.outcome;
    if outcome.ocr_available == Some(false) {
        let reason = outcome.ocr_error.as_deref().unwrap_or("OCR is not installed");
        warning(&format!("OCR unavailable: {}", reason));
        return;
    }

    if let Some(chars) = outcome.caracteres_extraidos {
        println!("   Extracted {} characters", chars);
    }
    if outcome.codigos.is_empty() {
        println!("   No codes detected");
        return;
    }
    println!(
        "   {} codes detected: {}",
        style(outcome.total_codigos.max(outcome.codigos.len() as u32)).bold(),
        outcome.codigos.join(", ")
    );
}

pub fn compression(outcome: &CompressOutcome) {
    println!(
        "{} Compressed to {} ({:.2} MB -> {:.2} MB, {:.1}% smaller)",
        style("✅").green(),
        style(&outcome.output_file).bold(),
        outcome.original_size_mb,
        outcome.compressed_size_mb,
        outcome.reduction_percent
    );
}

pub fn process(outcome: &ProcessOutcome) {
    println!(
        "{} {} documents written to {}",
        style("✅").green(),
        style(outcome.archivos_generados).bold(),
        outcome.ruta_salida
    );
    if !outcome.mensaje.is_empty() {
        println!("   {}", outcome.mensaje);
    }
}

pub fn preview(window: &PreviewWindow) {
    println!(
        "{} Preview opened: {}",
        style("👁").cyan(),
        style(&window.url).underlined()
    );
}

pub fn task_finished(task_id: &str, snapshot: &ProgressSnapshot) {
    if snapshot.status.is_success() {
        println!("{} Task {} completed", style("✅").green(), task_id);
    } else {
        failure(&format!("Task {} ended with status {}", task_id, snapshot.status));
    }
    for entry in &snapshot.messages {
        println!("   • {}", entry.message);
    }
}
