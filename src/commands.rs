use std::io::Write;
use std::path::Path;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::{Error, Result};
use crate::openai::{CompletionBackend, CompletionOptions};
use crate::tooling::file;

/// One-shot chat: validate, one completion call, hand back the text.
pub async fn one_shot_chat(
    backend: &dyn CompletionBackend,
    prompt: &str,
    options: &CompletionOptions,
) -> Result<String> {
    if prompt.trim().is_empty() {
        return Err(Error::Configuration("prompt must not be empty".into()));
    }
    backend.complete(prompt, options).await
}

/// One-shot edit. Without a file the edited text is returned for printing.
/// With a file, the file's full text plus the instruction become one
/// prompt and the file is overwritten with the raw model output. No diff,
/// no confirmation.
pub async fn one_shot_edit(
    backend: &dyn CompletionBackend,
    prompt: &str,
    target: Option<&Path>,
    options: &CompletionOptions,
) -> Result<String> {
    if prompt.trim().is_empty() {
        return Err(Error::Configuration("prompt must not be empty".into()));
    }

    match target {
        None => backend.complete(prompt, options).await,
        Some(path) => {
            let contents = file::read_to_string(path).await?;
            let full_prompt = build_edit_prompt(&contents, prompt);
            let edited = backend.complete(&full_prompt, options).await?;
            file::write_string(path, &edited).await?;
            Ok(format!("Updated {}", path.display()))
        }
    }
}

fn build_edit_prompt(contents: &str, instruction: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str("File contents:\n");
    prompt.push_str(contents);
    prompt.push_str("\n\nEdit instruction: ");
    prompt.push_str(instruction);
    prompt.push_str("\n\nReturn only the full edited file contents.");
    prompt
}

fn build_chat_prompt(history: &[(String, String)], current: &str) -> String {
    let mut prompt = String::new();

    if !history.is_empty() {
        prompt.push_str("Conversation so far:\n");
        for (user, assistant) in history {
            prompt.push_str(&format!("User: {user}\n"));
            prompt.push_str(&format!("Assistant: {assistant}\n"));
        }
        prompt.push('\n');
        prompt.push_str("Current message: ");
    }

    prompt.push_str(current);
    prompt
}

/// Interactive chat loop on stdin. Completion errors are printed and the
/// loop continues; only an input-stream failure ends it abnormally.
pub async fn interactive_chat(
    backend: &dyn CompletionBackend,
    options: &CompletionOptions,
) -> anyhow::Result<()> {
    println!("koai chat — type a message, 'exit' to quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut history: Vec<(String, String)> = Vec::new();

    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message == "exit" || message == "quit" {
            break;
        }

        let prompt = build_chat_prompt(&history, message);
        match backend.complete(&prompt, options).await {
            Ok(response) => {
                println!("AI: {response}");
                history.push((message.to_string(), response));
            }
            Err(e) => eprintln!("Error: {e}"),
        }
    }

    Ok(())
}

/// Interactive edit loop: every line is one edit instruction. With a file
/// argument the file is rewritten after each instruction; without one the
/// edited text goes to stdout.
pub async fn interactive_edit(
    backend: &dyn CompletionBackend,
    target: Option<&Path>,
    options: &CompletionOptions,
) -> anyhow::Result<()> {
    match target {
        Some(path) => println!("koai edit — instructions apply to {}, 'exit' to quit", path.display()),
        None => println!("koai edit — type an instruction, 'exit' to quit"),
    }
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let instruction = line.trim();
        if instruction.is_empty() {
            continue;
        }
        if instruction == "exit" || instruction == "quit" {
            break;
        }

        match one_shot_edit(backend, instruction, target, options).await {
            Ok(output) => println!("{output}"),
            Err(e) => eprintln!("Error: {e}"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingBackend {
        response: String,
        calls: AtomicUsize,
    }

    impl CountingBackend {
        fn returning(response: &str) -> Self {
            Self {
                response: response.to_string(),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionBackend for CountingBackend {
        async fn complete(&self, _prompt: &str, _options: &CompletionOptions) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    fn options() -> CompletionOptions {
        CompletionOptions {
            model: "gpt-3.5-turbo".into(),
            max_tokens: 100,
            temperature: 0.7,
            system_message: None,
        }
    }

    #[tokio::test]
    async fn one_shot_chat_returns_exactly_the_backend_text() {
        let backend = CountingBackend::returning("The answer is 42.");
        let result = one_shot_chat(&backend, "what is the answer", &options())
            .await
            .unwrap();
        assert_eq!(result, "The answer is 42.");
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn empty_prompt_makes_no_call() {
        let backend = CountingBackend::returning("unused");
        let err = one_shot_chat(&backend, "  ", &options()).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn missing_credential_fails_before_any_completion_call() {
        if std::env::var("OPENAI_API_KEY").is_ok() {
            return;
        }
        let backend = CountingBackend::returning("unused");
        let config = Config::default();

        // Same order as the dispatcher: resolve the credential first, only
        // then touch the backend.
        let outcome = match config.resolve_api_key() {
            Ok(_) => one_shot_chat(&backend, "hello", &options()).await,
            Err(e) => Err(e),
        };

        assert!(matches!(outcome, Err(Error::Configuration(_))));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn in_place_edit_overwrites_the_target_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.rs");
        file::write_string(&path, "fn main() {}").await.unwrap();

        let backend = CountingBackend::returning("fn main() { println!(\"hi\"); }");
        let summary = one_shot_edit(&backend, "add a greeting", Some(&path), &options())
            .await
            .unwrap();

        assert!(summary.contains("main.rs"));
        let rewritten = file::read_to_string(&path).await.unwrap();
        assert_eq!(rewritten, "fn main() { println!(\"hi\"); }");
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn edit_of_a_missing_file_names_the_path() {
        let backend = CountingBackend::returning("unused");
        let err = one_shot_edit(
            &backend,
            "rewrite it",
            Some(Path::new("/no/such/input.rs")),
            &options(),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("/no/such/input.rs"));
        assert_eq!(backend.calls(), 0);
    }

    #[test]
    fn chat_prompt_folds_history_in_order() {
        let history = vec![("hi".to_string(), "hello".to_string())];
        let prompt = build_chat_prompt(&history, "how are you");
        let hi = prompt.find("User: hi").unwrap();
        let hello = prompt.find("Assistant: hello").unwrap();
        let current = prompt.find("Current message: how are you").unwrap();
        assert!(hi < hello && hello < current);
    }
}
