use colloquy::TurnDetails;

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn print_turn(details: &TurnDetails, color: bool) {
    let palette = ansi::Palette::new(color);
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Input: \"{}\"", details.input), ansi::CYAN)));
    println!("  {} {}", palette.dim("normalized:"), palette.paint(&details.normalized_input, ansi::BLUE));

    println!("\n{}", palette.paint("━━━ Match ━━━", ansi::GRAY));
    match details.matched_rule {
        Some(idx) => println!(
            "  {} {}",
            palette.paint(format!("✓ rule #{idx}"), ansi::GREEN),
            palette.dim(format!("({} tried)", details.rules_tried))
        ),
        None => println!("  {}", palette.dim(format!("✗ no rule matched ({} tried)", details.rules_tried))),
    }

    if !details.recursion.is_empty() {
        println!("\n{}", palette.paint("━━━ Recursion ━━━", ansi::GRAY));
        for sub in &details.recursion {
            let indent = "  ".repeat(sub.depth);
            let outcome = match sub.matched_rule {
                Some(idx) => palette.paint(format!("rule #{idx}"), ansi::GREEN),
                None => palette.dim("no match"),
            };
            println!("{indent}{} {} {}", palette.paint(format!("[{}]", sub.depth), ansi::GRAY), sub.input, outcome);
        }
    }

    println!("\n{}", palette.paint("━━━ Reply ━━━", ansi::GRAY));
    match &details.output {
        Some(output) => println!("  {}", palette.bold(palette.paint(output, ansi::GREEN))),
        None => println!("  {}", palette.dim("...")),
    }

    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    println!("  Total: {}", palette.paint(format!("{:?}", details.elapsed), ansi::YELLOW));
    println!();
}
