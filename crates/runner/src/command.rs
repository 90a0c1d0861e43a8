use std::path::PathBuf;

/// A structured command line. Execution always goes through the token list;
/// the quoted string form exists only for logging.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub executable: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(executable: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            executable: executable.into(),
            args,
            cwd: None,
        }
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

/// Folds the wrapper chain into spawnable parts. The full token list is laid
/// out first (wrappers, then the real executable, then its arguments) and the
/// head is popped as the process image; everything after it becomes argv, so
/// each wrapper execs the next one and the chain terminates in the real
/// binary.
pub fn spawn_parts(spec: &CommandSpec, wrappers: &[String]) -> (PathBuf, Vec<String>) {
    let mut tokens: Vec<String> = wrappers
        .iter()
        .filter(|token| !token.is_empty())
        .cloned()
        .collect();
    tokens.push(spec.executable.to_string_lossy().into_owned());
    tokens.extend(spec.args.iter().filter(|arg| !arg.is_empty()).cloned());

    let image = PathBuf::from(tokens.remove(0));
    (image, tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_wrappers_the_executable_is_the_image() {
        let spec = CommandSpec::new("legendary", vec!["launch".to_string(), "Odyssey".to_string()]);
        let (image, argv) = spawn_parts(&spec, &[]);
        assert_eq!(image, PathBuf::from("legendary"));
        assert_eq!(argv, vec!["launch", "Odyssey"]);
    }

    #[test]
    fn test_first_wrapper_becomes_the_image() {
        let spec = CommandSpec::new("legendary", vec!["launch".to_string()]);
        let wrappers = vec![
            "gamemoderun".to_string(),
            "mangohud".to_string(),
            "--dlsym".to_string(),
        ];
        let (image, argv) = spawn_parts(&spec, &wrappers);
        assert_eq!(image, PathBuf::from("gamemoderun"));
        assert_eq!(argv, vec!["mangohud", "--dlsym", "legendary", "launch"]);
    }

    #[test]
    fn test_empty_tokens_are_filtered() {
        let spec = CommandSpec::new("wine", vec![String::new(), "winecfg".to_string()]);
        let wrappers = vec![String::new()];
        let (image, argv) = spawn_parts(&spec, &wrappers);
        assert_eq!(image, PathBuf::from("wine"));
        assert_eq!(argv, vec!["winecfg"]);
    }
}
