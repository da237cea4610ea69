use console::Style;
use stackreg_core::channels::ChannelSelection;
use stackreg_core::pipeline::AlignmentConfig;
use stackreg_core::FrameOffsets;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
        }
    }
}

pub fn print_alignment_summary(config: &AlignmentConfig, frames: usize, reference: &str) {
    let s = Styles::new();

    eprintln!();
    eprintln!("  {}", s.title.apply_to("Stack Registration"));
    eprintln!("  {}", s.title.apply_to("\u{2550}".repeat(18)));
    eprintln!();

    eprintln!("  {:<14}{}", s.label.apply_to("Frames"), s.value.apply_to(frames));
    let channels = match &config.channels {
        ChannelSelection::Single(c) => format!("{c}"),
        ChannelSelection::Summed(cs) => format!("sum of {cs:?}"),
    };
    eprintln!("  {:<14}{}", s.label.apply_to("Channels"), s.value.apply_to(channels));
    eprintln!();

    eprintln!("  {}", s.header.apply_to("Registration"));
    let mode = if config.progressive { "progressive" } else { "fixed reference" };
    eprintln!("    {:<12}{}", s.label.apply_to("Mode"), s.method.apply_to(mode));
    eprintln!("    {:<12}{}", s.label.apply_to("Reference"), s.value.apply_to(reference));
    eprintln!(
        "    {:<12}{}",
        s.label.apply_to("Precision"),
        s.value.apply_to(format!("1/{} px", config.upsampling))
    );
    eprintln!(
        "    {:<12}{}",
        s.label.apply_to("Window"),
        s.value.apply_to(format!("{} frame(s)", config.window_length))
    );
    if config.cutoff.is_all_pass() {
        eprintln!("    {:<12}{}", s.label.apply_to("Band-pass"), s.disabled.apply_to("disabled"));
    } else {
        eprintln!(
            "    {:<12}{}",
            s.label.apply_to("Band-pass"),
            s.value.apply_to(format!("{} .. {} cyc/px", config.cutoff.min, config.cutoff.max))
        );
    }
    eprintln!(
        "    {:<12}{}",
        s.label.apply_to("Edges"),
        s.method.apply_to(config.edge_extension)
    );
    eprintln!();

    if config.trials.is_empty() {
        eprintln!("  {:<14}{}", s.header.apply_to("Trials"), s.disabled.apply_to("whole stack"));
    } else {
        eprintln!("  {}", s.header.apply_to("Trials"));
        for (i, trial) in config.trials.iter().enumerate() {
            eprintln!(
                "    {}. {}",
                s.label.apply_to(i + 1),
                s.value.apply_to(format!("frames {}..={}", trial.start, trial.end))
            );
        }
    }
    eprintln!();
}

pub fn print_offsets_overview(offsets: &FrameOffsets) {
    let s = Styles::new();

    let (mut max_row, mut max_col) = (0.0f64, 0.0f64);
    for o in offsets.iter() {
        max_row = max_row.max(o.row.abs());
        max_col = max_col.max(o.col.abs());
    }

    eprintln!();
    eprintln!("  {}", s.header.apply_to("Offsets"));
    eprintln!("    {:<12}{}", s.label.apply_to("Frames"), s.value.apply_to(offsets.len()));
    eprintln!(
        "    {:<12}{}",
        s.label.apply_to("Max |row|"),
        s.value.apply_to(format!("{max_row:.3} px"))
    );
    eprintln!(
        "    {:<12}{}",
        s.label.apply_to("Max |col|"),
        s.value.apply_to(format!("{max_col:.3} px"))
    );
    eprintln!();
}
