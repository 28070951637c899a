use std::net::SocketAddr;

use structopt::StructOpt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use lockservice::{LockClient, LockId};

#[derive(Debug, PartialEq, Eq)]
enum Command {
    /// Acquire the given lock
    Lock {
        lock: LockId,
    },

    /// Release the given lock
    Unlock {
        lock: LockId,
    },

    Help,

    Quit,
}

const USAGE: &str = concat!(
    "--------------------------------------------------------------\n",
    "Possible commands:\n",
    "lock <ID>   | l <ID>  -- Block until lock <ID> is held\n",
    "unlock <ID> | u <ID>  -- Release lock <ID>\n",
    "help        | h       -- Show this message\n",
    "quit        | q       -- Exit\n",
    "--------------------------------------------------------------",
);

fn usage() {
    println!("{}", USAGE);
}

impl std::str::FromStr for Command {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut iter = s.split_whitespace();
        let command = iter.next().map(str::to_lowercase);
        let lock = iter.next().map(|lock| lock.parse::<LockId>().map_err(|_| ()));
        if iter.next().is_some() {
            return Err(())
        }
        match (command.as_deref(), lock) {
        | (Some("help"), None) | (Some("h"), None) => Ok(Command::Help),
        | (Some("quit"), None) | (Some("q"), None) => Ok(Command::Quit),
        | (Some("lock"), Some(lock)) | (Some("l"), Some(lock)) => {
            lock.map(|lock| Command::Lock { lock })
        }
        | (Some("unlock"), Some(lock)) | (Some("u"), Some(lock)) => {
            lock.map(|lock| Command::Unlock { lock })
        }
        | _ => Err(()),
        }
    }
}

#[derive(StructOpt)]
#[structopt(name = "lockservice-client")]
struct Opt {
    /// Client ID (random if omitted)
    #[structopt(short = "i", long = "id")]
    id: Option<i64>,

    /// Give up on a request after this long (in milliseconds)
    #[structopt(short = "t", long = "timeout")]
    timeout: Option<u64>,

    /// Client address of the server to talk to
    #[structopt(name = "SERVER")]
    server: SocketAddr,
}

#[tokio::main]
async fn main() {
    let opt = Opt::from_args();

    let mut client = match opt.id {
    | Some(id) => LockClient::with_id(opt.server, id),
    | None => LockClient::new(opt.server),
    };
    if let Some(timeout) = opt.timeout {
        client = client.with_timeout(std::time::Duration::from_millis(timeout));
    }

    println!("Client {} initialized", client.id());

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"> ").await.ok();
        stdout.flush().await.ok();

        let line = match lines.next_line().await {
        | Ok(Some(line)) => line,
        | _ => return,
        };

        if line.trim().is_empty() {
            continue
        }

        match line.parse::<Command>() {
        | Ok(Command::Lock { lock }) => println!("{}", client.lock(lock).await),
        | Ok(Command::Unlock { lock }) => println!("{}", client.unlock(lock).await),
        | Ok(Command::Help) => usage(),
        | Ok(Command::Quit) => return,
        | Err(()) => println!("[ERROR]: could not parse command"),
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn parses_every_command() {
        assert_eq!("lock 3".parse(), Ok(Command::Lock { lock: 3 }));
        assert_eq!("U 4".parse(), Ok(Command::Unlock { lock: 4 }));
        assert_eq!("h".parse(), Ok(Command::Help));
        assert_eq!("quit".parse(), Ok(Command::Quit));
        assert_eq!("lock".parse::<Command>(), Err(()));
        assert_eq!("lock x".parse::<Command>(), Err(()));
        assert_eq!("lock 1 2".parse::<Command>(), Err(()));
    }

    #[test]
    fn usage_lists_every_command() {
        for command in ["lock", "unlock", "help", "quit"] {
            let line = USAGE.lines()
                .find(|line| line.starts_with(command))
                .unwrap_or_else(|| panic!("usage is missing {}", command));
            let alias = &command[..1];
            assert!(line.contains(&format!("| {}", alias)));
        }
    }
}
