use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "intervo")]
#[command(about = "Score sung intervals and track relative-pitch practice")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Score a single sung note against a base and target
    Score {
        /// Base (reference) tone: a note name like C4 or a frequency in Hz
        #[arg(long)]
        base: String,

        /// Expected pitch: a note name or a frequency in Hz
        #[arg(long)]
        target: String,

        /// Detected frequency in Hz
        #[arg(long)]
        detected: f64,

        /// Time from reference tone to stable pitch, in milliseconds
        #[arg(long, default_value_t = 1000.0)]
        response_ms: f64,

        /// Input volume, 0 to 100
        #[arg(long, default_value_t = 50.0)]
        volume: f64,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score a full do → do' session from eight detected frequencies
    Session {
        /// Base (do) tone: a note name like C4 or a frequency in Hz
        #[arg(long)]
        base: String,

        /// Eight detected frequencies in Hz, comma-separated
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        sung: Vec<f64>,

        /// Response time applied to every note, in milliseconds
        #[arg(long, default_value_t = 1000.0)]
        response_ms: f64,

        /// Input volume applied to every note, 0 to 100
        #[arg(long, default_value_t = 50.0)]
        volume: f64,

        /// Store the session result in the database
        #[arg(long)]
        save: bool,

        /// Print the session record as JSON
        #[arg(long)]
        json: bool,
    },

    /// List stored sessions
    Sessions {
        #[arg(long)]
        json: bool,
    },

    /// Show the overall grade across the last eight sessions
    Overall {
        #[arg(long)]
        json: bool,
    },

    /// Show the interval reference table
    Intervals,

    /// Show where data and config files are stored
    Paths,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_score_command() {
        let cli = Cli::parse_from([
            "intervo", "score", "--base", "A4", "--target", "C#5", "--detected", "554.37",
            "--response-ms", "800",
        ]);
        match cli.command {
            Command::Score {
                base,
                detected,
                response_ms,
                volume,
                json,
                ..
            } => {
                assert_eq!(base, "A4");
                assert_eq!(detected, 554.37);
                assert_eq!(response_ms, 800.0);
                assert_eq!(volume, 50.0);
                assert!(!json);
            }
            _ => panic!("expected score command"),
        }
    }

    #[test]
    fn parses_comma_separated_session() {
        let cli = Cli::parse_from([
            "intervo",
            "-v",
            "session",
            "--base",
            "C4",
            "--sung",
            "261.6,293.7,329.6,349.2,392.0,440.0,493.9,523.3",
            "--save",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Command::Session { sung, save, .. } => {
                assert_eq!(sung.len(), 8);
                assert!(save);
            }
            _ => panic!("expected session command"),
        }
    }
}
