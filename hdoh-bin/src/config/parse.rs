use clap::Arg;

/// Parsed options
pub struct Opts {
  pub listen_socket: Option<String>,
  pub upstreams: Option<String>,
}

/// Parse arg values passed from cli
pub fn parse_opts() -> Result<Opts, anyhow::Error> {
  let _ = include_str!("../../Cargo.toml");
  let options = clap::command!()
    .arg(
      Arg::new("listen")
        .long("listen")
        .short('l')
        .value_name("SOCKET")
        .help("Socket address to listen on like 0.0.0.0:8080"),
    )
    .arg(
      Arg::new("upstreams")
        .long("upstreams")
        .short('u')
        .value_name("LIST")
        .help("Comma, whitespace or newline separated upstream DoH urls, overriding $DOH_UPSTREAMS"),
    );

  let matches = options.get_matches();

  ///////////////////////////////////
  let listen_socket = matches.get_one::<String>("listen").cloned();
  let upstreams = matches.get_one::<String>("upstreams").cloned();

  Ok(Opts {
    listen_socket,
    upstreams,
  })
}
