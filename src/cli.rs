use anyhow::{anyhow, Context, Result};
use rand::Rng;
use std::process::{Command, ExitStatus, Stdio};
use std::str::FromStr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::finder::{CandidateSet, ExclusionList, MovieFinder};
use crate::models::Recommendation;

const PROMPT: &str =
    "Choose an option [(y)es/(o)pen/(t)railer/(s)een/(n)ext/(x)neverwatch/(q)uit]: ";

/// Opens URLs for the user. The session only ever talks to this trait so it
/// can run without a desktop.
pub trait Launcher: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

/// Hands the URL to the platform's default opener.
pub struct SystemBrowser;

impl Launcher for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        let mut cmd = if cfg!(target_os = "macos") {
            Command::new("open")
        } else if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", "start", ""]);
            c
        } else {
            Command::new("xdg-open")
        };
        cmd.arg(url);
        spawn_reaped(cmd).with_context(|| format!("Failed to launch browser for {}", url))?;
        debug!("Opened {}", url);
        Ok(())
    }
}

/// Starts `cmd` detached from our stdio and waits on it from a background
/// thread, so repeated opens don't pile up zombies. The handle yields the
/// exit status once the opener is done.
fn spawn_reaped(mut cmd: Command) -> Result<std::thread::JoinHandle<Option<ExitStatus>>> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    Ok(std::thread::spawn(move || match child.wait() {
        Ok(status) => {
            if !status.success() {
                debug!("Browser opener exited with {}", status);
            }
            Some(status)
        }
        Err(e) => {
            warn!("Failed to wait on browser opener: {}", e);
            None
        }
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Yes,
    Open,
    Trailer,
    Seen,
    Next,
    NeverWatch,
    Quit,
}

impl FromStr for Action {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "y" | "yes" => Ok(Action::Yes),
            "o" | "open" => Ok(Action::Open),
            "t" | "trailer" => Ok(Action::Trailer),
            "s" | "seen" => Ok(Action::Seen),
            "n" | "next" => Ok(Action::Next),
            "x" | "neverwatch" => Ok(Action::NeverWatch),
            "q" | "quit" => Ok(Action::Quit),
            other => Err(anyhow!("unknown option '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user picked this movie.
    Accepted(i64),
    Quit,
    Exhausted,
}

pub fn format_recommendation(rec: &Recommendation) -> String {
    let certification = rec
        .certification
        .as_deref()
        .map(|c| format!("[{}] ", c))
        .unwrap_or_default();
    let mut lines = vec![
        format!("🎬 Movie Recommendation: {}{}", certification, rec.movie.title),
        format!("🎭 Genres: {}", rec.genres.join(", ")),
        format!("🌟 User Rating: {}", rec.movie.vote_average),
        format!("📅 Release Date: {}", rec.movie.release_date),
    ];
    if let Some(runtime) = rec.runtime_minutes {
        lines.push(format!("⏱️ Runtime: {} min", runtime));
    }
    lines.push(format!("📝 Description: {}", rec.description()));
    lines.push(format!("🔗 Link: {}", rec.url));
    lines.push(format!("📺 Streaming on: {}", rec.streaming));
    lines.join("\n")
}

/// Presents random candidates until the user accepts one, quits, or the set
/// runs dry. Every advancing action removes the current movie from
/// `candidates`, so nothing is offered twice.
pub async fn run_session<R, W, G>(
    finder: &MovieFinder,
    candidates: &mut CandidateSet,
    input: &mut R,
    output: &mut W,
    launcher: &dyn Launcher,
    rng: &mut G,
) -> Result<SessionEnd>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    G: Rng + ?Sized,
{
    loop {
        let Some(movie) = candidates.choose(rng).cloned() else {
            say(output, "No more movies match your criteria.").await?;
            return Ok(SessionEnd::Exhausted);
        };

        let rec = match finder.recommendation(&movie).await {
            Ok(rec) => rec,
            Err(e) => {
                warn!("Failed to load details for movie {}: {:#}", movie.id, e);
                say(output, &format!("Could not load all details: {:#}", e)).await?;
                Recommendation::bare(movie.clone())
            }
        };
        say(output, &format_recommendation(&rec)).await?;

        loop {
            output.write_all(PROMPT.as_bytes()).await?;
            output.flush().await?;

            let mut line = String::new();
            if input.read_line(&mut line).await? == 0 {
                return Ok(SessionEnd::Quit);
            }
            let action = match line.parse::<Action>() {
                Ok(action) => action,
                Err(e) => {
                    say(output, &format!("{}, try again.", e)).await?;
                    continue;
                }
            };

            match action {
                Action::Yes => {
                    open_url(launcher, output, &rec.url).await?;
                    return Ok(SessionEnd::Accepted(movie.id));
                }
                Action::Open => open_url(launcher, output, &rec.url).await?,
                Action::Trailer => match finder.trailer_url(movie.id).await {
                    Ok(Some(url)) => open_url(launcher, output, &url).await?,
                    Ok(None) => say(output, "No trailer available.").await?,
                    Err(e) => say(output, &format!("Trailer lookup failed: {:#}", e)).await?,
                },
                Action::Seen | Action::NeverWatch => {
                    let list = if action == Action::Seen {
                        ExclusionList::Watched
                    } else {
                        ExclusionList::NeverWatch
                    };
                    match finder.mark(list, movie.id).await {
                        Ok(()) => {
                            candidates.remove(movie.id);
                            break;
                        }
                        Err(e) => {
                            say(output, &format!("Failed to mark as {}: {:#}", list, e)).await?
                        }
                    }
                }
                Action::Next => {
                    candidates.remove(movie.id);
                    break;
                }
                Action::Quit => return Ok(SessionEnd::Quit),
            }
        }
    }
}

async fn open_url<W: AsyncWrite + Unpin>(
    launcher: &dyn Launcher,
    output: &mut W,
    url: &str,
) -> Result<()> {
    if let Err(e) = launcher.open(url) {
        warn!("{:#}", e);
        say(output, &format!("Could not open {}", url)).await?;
    }
    Ok(())
}

async fn say<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}
