/// Shell snippets standing in for interpreter workloads
pub mod scripts {
    pub const HELLO: &str = "echo 'Hello from the sandbox!'\n";

    pub const INFINITE_LOOP: &str = "while :; do :; done\n";

    pub const RECORD_PID_THEN_LOOP: &str = "echo $$ > \"$PID_FILE\"\nwhile :; do :; done\n";

    pub const COMPILER_DIAGNOSTICS: &str = r#"echo 'main.swift:2:1: error: cannot find x in scope' >&2
echo 'main.swift:1:5: warning: initialization of a was never used' >&2
echo 'main.swift:1:5: note: consider replacing with _' >&2
exit 1
"#;

    /// Roughly 300KB on each stream, interleaved line by line
    pub const INTERLEAVED_FLOOD: &str = r#"i=0
while [ $i -lt 5000 ]; do
  echo "stdout line $i ..................................................."
  echo "stderr line $i ..................................................." >&2
  i=$((i+1))
done
"#;

    pub const NON_UTF8: &str = "printf 'caf\\351\\n'\n";

    pub const WORKING_DIRECTORY: &str = "pwd\necho \"$HOME\"\n";

    /// Exits quickly, leaving a helper in its own session holding both pipes
    pub const DETACHED_HELPER: &str = "setsid -f sh -c 'sleep 8; echo late; echo late >&2'\nsleep 0.2\necho done\n";

    pub const LEAVE_FILE_IN_HOME: &str = "echo secret > \"$HOME/leak\"\nsleep 0.5\n";

    pub const LIST_HOME: &str = "cat \"$HOME/leak\" 2>/dev/null\nls -A \"$HOME\"\n";
}
