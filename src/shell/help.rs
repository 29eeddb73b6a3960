pub(crate) const USAGE_MSG: &str = "usage: jobsh [-hiV] [-m jobs] [-p prompt]";

const DESCRIPTOR: &str = "jobsh - a small shell with job control";

const HELP_MSG: &str = "Options:
  -h, --help               display help message and exit
  -i, --interactive        print the prompt even when input is not a terminal
  -m, --max-jobs=N         track at most N jobs at once (1 to 64, default 5)
  -p, --prompt=TEXT        prompt printed before each command
  -V, --version            display version information and exit

Builtins:
  jobs                     list the tracked jobs
  fg %N|PID                continue a job in the foreground
  bg %N|PID                continue a job in the background
  kill %N|PID              kill a job
  cd PATH, pwd             change or print the working directory
  quit                     kill every job and exit
";

pub(crate) fn long_help_message() -> String {
    format!("{USAGE_MSG}\n\n{DESCRIPTOR}\n\n{HELP_MSG}")
}
