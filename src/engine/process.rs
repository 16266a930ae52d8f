//! A concrete [`EngineClient`] backed by a real UCI subprocess (e.g.
//! Stockfish): a spawn/handshake/parse sequence trimmed to the one
//! request/response shape this crate needs: `position fen ... / go depth N`
//! then collect `info` lines until `bestmove`.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, trace, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::Mutex as AsyncMutex;
use vampirc_uci::uci::ScoreValue;
use vampirc_uci::{parse_one, UciInfoAttribute, UciMessage};

use super::client::EngineClient;
use super::types::{AnalysisLine, AnalysisResult, EngineError, EngineResult};
use crate::rules;

pub struct UciProcessClient {
    path: PathBuf,
    inner: AsyncMutex<Option<Handle>>,
}

struct Handle {
    child: Child,
    stdin: ChildStdin,
    reader: tokio::io::Lines<BufReader<tokio::process::ChildStdout>>,
}

impl UciProcessClient {
    pub fn new(path: PathBuf) -> Self {
        Self { path, inner: AsyncMutex::new(None) }
    }

    async fn ensure_started(&self) -> EngineResult<()> {
        let mut guard = self.inner.lock().await;
        if guard.is_some() {
            return Ok(());
        }
        let mut child = Command::new(&self.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        let mut stdin = child.stdin.take().ok_or(EngineError::BrokenPipe)?;
        let stdout = child.stdout.take().ok_or(EngineError::BrokenPipe)?;
        let mut reader = BufReader::new(stdout).lines();

        stdin.write_all(b"uci\n").await?;
        wait_for(&mut reader, "uciok", Duration::from_secs(10)).await?;
        stdin.write_all(b"isready\n").await?;
        wait_for(&mut reader, "readyok", Duration::from_secs(5)).await?;

        *guard = Some(Handle { child, stdin, reader });
        Ok(())
    }
}

async fn wait_for(
    reader: &mut tokio::io::Lines<BufReader<tokio::process::ChildStdout>>,
    token: &str,
    deadline: Duration,
) -> EngineResult<()> {
    tokio::time::timeout(deadline, async {
        while let Some(line) = reader.next_line().await? {
            if line.trim() == token {
                return Ok(());
            }
        }
        Err(EngineError::BrokenPipe)
    })
    .await
    .map_err(|_| EngineError::InitTimeout)?
}

#[async_trait]
impl EngineClient for UciProcessClient {
    async fn analyze(
        &self,
        fen: &str,
        depth: u32,
        multi_pv: usize,
        timeout: Duration,
    ) -> EngineResult<AnalysisResult> {
        self.ensure_started().await?;
        let mut guard = self.inner.lock().await;
        let handle = guard.as_mut().ok_or(EngineError::BrokenPipe)?;
        let pos = rules::position_from_fen(fen)?;

        handle.stdin.write_all(format!("setoption name MultiPV value {multi_pv}\n").as_bytes()).await?;
        handle.stdin.write_all(format!("position fen {fen}\n").as_bytes()).await?;
        handle.stdin.write_all(format!("go depth {depth}\n").as_bytes()).await?;

        let started = Instant::now();
        let mut by_pv: std::collections::BTreeMap<u8, (i32, Vec<String>)> = std::collections::BTreeMap::new();
        let mut depth_reached = 0u32;
        let mut bestmove: Option<String> = None;

        let result = tokio::time::timeout(timeout, async {
            loop {
                let Some(line) = handle.reader.next_line().await? else { break };
                trace!("engine: {line}");
                match parse_one(&line) {
                    UciMessage::Info(attrs) => {
                        if let Some(record) = parse_info_line(&pos, &attrs) {
                            depth_reached = depth_reached.max(record.0);
                            by_pv.insert(record.1, (record.2, record.3));
                        }
                    }
                    UciMessage::BestMove { best_move, .. } => {
                        bestmove = Some(best_move.to_string());
                        break;
                    }
                    _ => {}
                }
            }
            Ok::<(), EngineError>(())
        })
        .await;

        let partial = result.is_err();
        if partial {
            warn!("engine analyze timed out at fen={fen} depth={depth} after {:?}", started.elapsed());
            let _ = handle.stdin.write_all(b"stop\n").await;
        }

        let lines: Vec<AnalysisLine> = by_pv
            .into_iter()
            .map(|(_, (eval_cp, pv_san))| AnalysisLine {
                move_san: pv_san.first().cloned().unwrap_or_default(),
                eval_cp,
                pv_san,
            })
            .collect();

        let best_move_san = bestmove
            .and_then(|uci| rules::resolve_uci(fen, &uci).ok().map(|mv| rules::move_to_san(&pos, &mv)))
            .or_else(|| lines.first().map(|l| l.move_san.clone()));

        let eval_cp = lines.first().map(|l| l.eval_cp).unwrap_or(0);
        let pv_san = lines.first().map(|l| l.pv_san.clone()).unwrap_or_default();

        debug!("analyze fen={fen} depth={depth_reached}/{depth} lines={} partial={partial}", lines.len());

        Ok(AnalysisResult { eval_cp, best_move_san, pv_san, lines, depth_reached, partial })
    }
}

/// Parse one `info ...` line into `(depth, multipv_index, eval_cp, pv_san)`,
/// skipping lines without a usable PV (e.g. pure `nps`/`hashfull` updates).
fn parse_info_line(
    pos: &shakmaty::Chess,
    attrs: &[UciInfoAttribute],
) -> Option<(u32, u8, i32, Vec<String>)> {
    let mut depth = 0u32;
    let mut multipv = 1u8;
    let mut eval_cp = 0i32;
    let mut pv_san: Vec<String> = Vec::new();
    let turn_sign = if pos.turn() == shakmaty::Color::Black { -1 } else { 1 };

    for attr in attrs {
        match attr {
            UciInfoAttribute::Depth(d) => depth = *d as u32,
            UciInfoAttribute::MultiPv(m) => multipv = *m as u8,
            UciInfoAttribute::Score(score) => {
                eval_cp = match score.score {
                    ScoreValue::Cp(cp) => cp * turn_sign,
                    ScoreValue::Mate(plies) => super::types::encode_mate(plies as i32) * turn_sign,
                };
            }
            UciInfoAttribute::Pv(moves) => {
                let mut temp = pos.clone();
                for mv in moves {
                    let Ok(uci) = mv.to_string().parse::<shakmaty::uci::UciMove>() else { break };
                    let Ok(m) = uci.to_move(&temp) else { break };
                    let san = rules::move_to_san(&temp, &m);
                    shakmaty::Position::play_unchecked(&mut temp, &m);
                    pv_san.push(san);
                }
            }
            _ => {}
        }
    }

    if pv_san.is_empty() {
        None
    } else {
        Some((depth, multipv, eval_cp, pv_san))
    }
}
