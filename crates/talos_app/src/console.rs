//! Terminal adapters for the rebuild UI: dialoguer prompts, an indicatif
//! progress bar for the sweep, and the interactive apply menu.

use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use talos_core::{ApplyEvent, BootSector, EventSource, RebuildUi};

use crate::dump;

pub struct ConsoleUi {
    running: Arc<AtomicBool>,
    bar: Option<ProgressBar>,
    interactive: bool,
}

impl ConsoleUi {
    /// `interactive` controls whether prompts may block on the terminal;
    /// a scripted run answers confirmations with "no" and keeps override
    /// defaults.
    pub fn new(running: Arc<AtomicBool>, interactive: bool) -> Self {
        Self {
            running,
            bar: None,
            interactive,
        }
    }

    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl RebuildUi for ConsoleUi {
    fn message(&mut self, text: &str) {
        match &self.bar {
            Some(bar) => bar.println(text),
            None => println!("{text}"),
        }
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        if !self.interactive {
            return false;
        }
        self.finish();
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false)
    }

    fn ask_number(&mut self, prompt: &str, default: u64, max: u64) -> u64 {
        if !self.interactive {
            return default;
        }
        self.finish();
        loop {
            let value = Input::<u64>::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt.trim_end())
                .default(default)
                .interact_text()
                .unwrap_or(default);
            if max == 0 || value <= max {
                return value;
            }
            println!("Value must be at most {max}");
        }
    }

    fn progress(&mut self, scanned: u64, total: u64) {
        let bar = self.bar.get_or_insert_with(|| {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] [{bar:50.cyan/blue}] {pos}/{len} sectors ({eta})")
                    .unwrap()
                    .progress_chars("##-"),
            );
            pb
        });
        bar.set_position(scanned);
    }

    fn stop_requested(&self) -> bool {
        !self.running.load(Ordering::SeqCst)
    }

    fn show_diff(&mut self, newboot: &[u8; 512], current: &[u8; 512]) {
        self.finish();
        let a = BootSector::new(newboot);
        let b = BootSector::new(current);
        println!("                          Rebuild       Current");
        println!(
            "filesystem size           {:>12} {:>12}",
            a.filesystem_size(),
            b.filesystem_size()
        );
        println!(
            "sectors_per_cluster       {:>12} {:>12}",
            a.sectors_per_cluster(),
            b.sectors_per_cluster()
        );
        println!("mft_lcn                   {:>12} {:>12}", a.mft_lcn(), b.mft_lcn());
        println!(
            "mftmirr_lcn               {:>12} {:>12}",
            a.mftmirr_lcn(),
            b.mftmirr_lcn()
        );
        println!(
            "clusters_per_mft_record   {:>12} {:>12}",
            a.clusters_per_mft_record(),
            b.clusters_per_mft_record()
        );
        println!(
            "clusters_per_index_record {:>12} {:>12}",
            a.clusters_per_index_record(),
            b.clusters_per_index_record()
        );
    }

    fn show_dump(&mut self, newboot: &[u8; 512], current: &[u8; 512]) {
        self.finish();
        dump::dump_side_by_side(newboot, current);
    }
}

/// The interactive apply menu, mirroring the scripted verbs.
pub struct InteractiveMenu;

impl EventSource for InteractiveMenu {
    fn next_event(&mut self) -> ApplyEvent {
        let items = [
            "Dump sector",
            "List directories and files",
            "Write boot",
            "Quit this section",
        ];
        match Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Rebuild boot sector")
            .items(&items)
            .default(3)
            .interact()
        {
            Ok(0) => ApplyEvent::Dump,
            Ok(1) => ApplyEvent::List,
            Ok(2) => ApplyEvent::Write,
            _ => ApplyEvent::Quit,
        }
    }
}
