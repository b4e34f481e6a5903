use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Vokabellisten fotografieren, extrahieren, ordnen und als Test drucken
#[derive(Parser, Debug)]
#[command(name = "vokabel-scan", version, about)]
pub struct Cli {
    /// Ausführliche Protokollausgabe
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Vokabeln aus einem Foto extrahieren (und optional speichern)
    Scan {
        /// Bilddatei der Vokabelliste
        image: PathBuf,
        /// Unter diesem Namen als Vokabelseite speichern
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Vokabelseiten auflisten
    Pages {
        /// Nur Seiten ohne Buch anzeigen
        #[arg(short, long, default_value_t = false)]
        unassigned: bool,
    },
    /// Eine Vokabelseite anzeigen oder löschen
    Page {
        #[command(subcommand)]
        action: PageAction,
    },
    /// Bücher verwalten
    Book {
        #[command(subcommand)]
        action: BookAction,
    },
    /// Eine Vokabelseite einem Buch zuordnen
    Assign { page: String, book: String },
    /// Eine Vokabelseite aus einem Buch entfernen
    Unassign { page: String, book: String },
    /// Vokabeltest als PDF erzeugen
    Print {
        page: String,
        /// Zielverzeichnis (Standard: Ausgabeverzeichnis der Konfiguration)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// API-Schlüssel verwalten
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum PageAction {
    Show { id: String },
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum BookAction {
    Create {
        name: String,
        /// Coverbild
        #[arg(short, long)]
        cover: Option<PathBuf>,
    },
    List,
    Show { id: String },
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum KeyAction {
    Set { key: String },
    Show,
    Clear,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scan_with_name() {
        let cli = Cli::parse_from(["vokabel-scan", "scan", "liste.jpg", "--name", "Unit 1"]);
        match cli.command {
            Command::Scan { image, name } => {
                assert_eq!(image, PathBuf::from("liste.jpg"));
                assert_eq!(name.as_deref(), Some("Unit 1"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_nested_commands() {
        let cli = Cli::parse_from(["vokabel-scan", "-v", "book", "create", "English G21"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Book { action: BookAction::Create { ref name, cover: None } } if name == "English G21"));

        let cli = Cli::parse_from(["vokabel-scan", "assign", "p1", "b1"]);
        assert!(matches!(cli.command, Command::Assign { ref page, ref book } if page == "p1" && book == "b1"));
    }
}
