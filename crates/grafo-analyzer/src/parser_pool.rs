//! Thread-safe pool of tree-sitter C# parsers
//!
//! Tree-sitter parsers are not Sync, so parsing goes through dedicated
//! worker threads behind a channel. Workers keep their parser configured
//! for C# across requests.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, mpsc};

use anyhow::Result;
use tree_sitter::{Parser, Tree};

/// A successfully parsed source file.
#[derive(Debug)]
pub struct ParsedSource {
    pub path: PathBuf,
    pub text: String,
    pub tree: Tree,
}

impl ParsedSource {
    /// Number of ERROR nodes in the tree, counted as parse diagnostics.
    pub fn error_count(&self) -> usize {
        fn count(node: tree_sitter::Node) -> usize {
            let mut total = if node.is_error() || node.is_missing() { 1 } else { 0 };
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                total += count(child);
            }
            total
        }
        if self.tree.root_node().has_error() {
            count(self.tree.root_node())
        } else {
            0
        }
    }
}

struct WorkerRequest {
    path: PathBuf,
    text: String,
    response: mpsc::Sender<Result<ParsedSource>>,
}

/// Channel-fronted parser pool.
#[derive(Clone)]
pub struct ParserPool {
    sender: mpsc::Sender<WorkerRequest>,
}

impl ParserPool {
    pub fn new(num_workers: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<WorkerRequest>();
        let receiver = Arc::new(Mutex::new(receiver));

        for worker_id in 0..num_workers.max(1) {
            let receiver = receiver.clone();
            std::thread::spawn(move || Self::worker_thread(worker_id, receiver));
        }

        Self { sender }
    }

    /// Pool sized to the machine, at least 2 workers.
    pub fn with_default_size() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get().max(2))
            .unwrap_or(2);
        Self::new(workers)
    }

    fn worker_thread(worker_id: usize, receiver: Arc<Mutex<mpsc::Receiver<WorkerRequest>>>) {
        tracing::debug!("parser worker {} started", worker_id);

        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&tree_sitter_c_sharp::LANGUAGE.into()) {
            tracing::error!("parser worker {}: cannot load C# grammar: {}", worker_id, e);
            return;
        }

        loop {
            let request = match receiver.lock().expect("pool receiver lock").recv() {
                Ok(req) => req,
                Err(_) => {
                    tracing::debug!("parser worker {} shutting down", worker_id);
                    break;
                }
            };

            let WorkerRequest {
                path,
                text,
                response,
            } = request;

            let result = match parser.parse(&text, None) {
                Some(tree) => Ok(ParsedSource { path, text, tree }),
                None => Err(anyhow::anyhow!("tree-sitter returned no tree")),
            };

            if response.send(result).is_err() {
                tracing::warn!("parse result receiver dropped");
            }
        }
    }

    /// Parse synchronously on a pool worker, blocking the caller.
    pub fn parse_blocking(&self, path: PathBuf, text: String) -> Result<ParsedSource> {
        let (response, rx) = mpsc::channel();
        self.sender
            .send(WorkerRequest {
                path,
                text,
                response,
            })
            .map_err(|_| anyhow::anyhow!("parser pool is shut down"))?;
        rx.recv().map_err(|_| anyhow::anyhow!("parser worker died"))?
    }

    /// Parse from an async context without blocking the runtime.
    pub async fn parse(&self, path: PathBuf, text: String) -> Result<ParsedSource> {
        let pool = self.clone();
        tokio::task::spawn_blocking(move || pool.parse_blocking(path, text))
            .await
            .map_err(|e| anyhow::anyhow!("parse task join error: {}", e))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_a_compilation_unit() {
        let pool = ParserPool::with_default_size();
        let source = r#"
namespace Demo {
    public class Greeter {
        public string Greet(string name) { return name; }
    }
}
"#
        .to_string();

        let parsed = pool
            .parse(PathBuf::from("Greeter.cs"), source)
            .await
            .unwrap();
        assert_eq!(parsed.tree.root_node().kind(), "compilation_unit");
        assert_eq!(parsed.error_count(), 0);
    }

    #[tokio::test]
    async fn counts_syntax_errors() {
        let pool = ParserPool::with_default_size();
        let parsed = pool
            .parse(
                PathBuf::from("Broken.cs"),
                "class Broken { void M( }".to_string(),
            )
            .await
            .unwrap();
        assert!(parsed.error_count() > 0);
    }
}
