use std::path::Path;

use super::command;

/// Bucketed porcelain status. Rebuilt wholesale on every refresh; the
/// previous snapshot is discarded, never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitStatusSnapshot {
    pub staged: Vec<(char, String)>,
    pub modified: Vec<(char, String)>,
    pub untracked: Vec<String>,
}

impl GitStatusSnapshot {
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty() && self.modified.is_empty() && self.untracked.is_empty()
    }
}

fn status_icon(code: char) -> char {
    match code {
        'M' => '●',
        'A' => '+',
        'D' => '−',
        'R' => '→',
        'C' => '©',
        'U' => '!',
        _ => '?',
    }
}

/// Parse `git status --porcelain` output. Column 0 set means staged,
/// column 1 set means modified; a path with both columns set lands in both
/// buckets. Exactly `??` is untracked.
pub fn parse_porcelain(output: &str) -> GitStatusSnapshot {
    let mut snapshot = GitStatusSnapshot::default();

    for line in output.lines() {
        if line.trim().is_empty() || line.len() < 3 {
            continue;
        }
        let mut chars = line.chars();
        let index_code = chars.next().unwrap_or(' ');
        let worktree_code = chars.next().unwrap_or(' ');
        let path = line[2..].trim_start().to_string();
        if path.is_empty() {
            continue;
        }

        if index_code == '?' && worktree_code == '?' {
            snapshot.untracked.push(path);
            continue;
        }

        if index_code != ' ' && index_code != '?' {
            snapshot
                .staged
                .push((status_icon(index_code), path.clone()));
        }
        if worktree_code != ' ' && worktree_code != '?' {
            snapshot.modified.push((status_icon(worktree_code), path));
        }
    }

    snapshot
}

/// Read the current status. Failure (git missing, not a repository,
/// non-zero exit) comes back as a displayable string, never an error that
/// can kill the session.
pub async fn read_status(cwd: Option<&Path>) -> Result<GitStatusSnapshot, String> {
    let result = command::run("git", &["status", "--porcelain"], cwd)
        .await
        .map_err(|e| e.to_string())?;

    if !result.success {
        let detail = if result.stderr.trim().is_empty() {
            "not a git repository".to_string()
        } else {
            result.stderr.trim().to_string()
        };
        return Err(format!("Git error: {detail}"));
    }

    Ok(parse_porcelain(&result.stdout))
}

/// Working tree or staged diff as plain text.
pub async fn diff(staged: bool, cwd: Option<&Path>) -> Result<String, String> {
    let args: &[&str] = if staged {
        &["diff", "--cached"]
    } else {
        &["diff"]
    };
    let result = command::run("git", args, cwd)
        .await
        .map_err(|e| e.to_string())?;
    if !result.success {
        return Err(format!("Git diff failed: {}", result.stderr.trim()));
    }
    Ok(result.stdout)
}

pub async fn log(count: usize, cwd: Option<&Path>) -> Result<String, String> {
    let count_arg = format!("-{count}");
    let result = command::run("git", &["log", "--oneline", &count_arg], cwd)
        .await
        .map_err(|e| e.to_string())?;
    if !result.success {
        return Err(format!("Git log failed: {}", result.stderr.trim()));
    }
    Ok(result.stdout)
}
