use crate::layout::InstanceLayout;
use burrow_config::{ChannelEndpoint, LaunchConfig};

/// Flat argument list under construction, grouped by flag. QEMU options
/// that reference each other by id (`net0`, `mon0`, `ser0`) are emitted
/// in declaration order; the serialization to strings happens here and
/// nowhere else.
#[derive(Debug, Default)]
struct CommandLine {
    args: Vec<String>,
}

impl CommandLine {
    fn arg(&mut self, value: impl Into<String>) -> &mut Self {
        self.args.push(value.into());
        self
    }

    fn flag(&mut self, flag: &str, value: impl Into<String>) -> &mut Self {
        self.args.push(flag.to_owned());
        self.args.push(value.into());
        self
    }
}

/// Build the full emulator invocation for one instance.
///
/// Deterministic: a pure function of the launch config and the paths
/// resolved through the layout. The relative order of groups is part of
/// the contract with QEMU's flag grammar.
pub fn build_launch_command(
    layout: &InstanceLayout,
    id: &str,
    config: &LaunchConfig,
) -> Vec<String> {
    let mut cmd = CommandLine::default();

    cmd.arg(format!("qemu-system-{}", config.machine.arch));

    // basic machine shape
    cmd.flag("-machine", config.machine.machine_type.as_str())
        .flag("-cpu", config.machine.cpu.as_str())
        .flag("-smp", config.machine.smp.to_string())
        .flag("-m", config.machine.memory.as_str());

    // single guest NIC bound to the user-mode backend
    cmd.flag("-device", format!("{},netdev=net0", config.network.device));

    let mut netdev = vec![
        "user".to_owned(),
        "id=net0".to_owned(),
        format!("hostfwd=tcp::{}-:22", config.network.ssh_port),
    ];
    for rule in &config.network.ports {
        netdev.push(format!("hostfwd={rule}"));
    }
    let mut netdev = netdev.join(",");
    if let Some(extra) = &config.network.extra_args {
        // appended onto the backend option string, never a new -netdev
        netdev.push(',');
        netdev.push_str(extra);
    }
    cmd.flag("-netdev", netdev);

    // primary disk
    cmd.flag(
        "-drive",
        format!(
            "if=virtio,format=qcow2,file={}",
            layout.image_path(id).display()
        ),
    );

    // aarch64 boots through UEFI: code (read-only) and vars pflash drives
    if config.requires_uefi_firmware() {
        cmd.flag(
            "-drive",
            format!(
                "if=pflash,format=raw,file={},readonly=on",
                layout.firmware_code(id).display()
            ),
        );
        cmd.flag(
            "-drive",
            format!(
                "if=pflash,format=raw,file={}",
                layout.firmware_vars(id).display()
            ),
        );
    }

    // line-oriented monitor, listening without blocking startup
    let control =
        ChannelEndpoint::resolve(config.channels.control_port, layout.control_socket(id));
    cmd.flag(
        "-chardev",
        format!("socket,id=mon0,{},server=on,wait=off", control.chardev_clause()),
    );
    cmd.flag("-mon", "chardev=mon0,mode=readline");

    // guest serial port over the debug channel
    let debug = ChannelEndpoint::resolve(config.channels.debug_port, layout.serial_socket(id));
    cmd.flag(
        "-chardev",
        format!("socket,id=ser0,{},server=on,wait=off", debug.chardev_clause()),
    );
    cmd.flag("-serial", "chardev:ser0");

    cmd.flag("-pidfile", layout.pid_file(id).display().to_string());

    cmd.flag("-parallel", "null")
        .flag("-monitor", "none")
        .flag("-display", "none")
        .flag("-vga", "none");

    if !config.launch.foreground {
        cmd.arg("-daemonize");
    }

    // user-supplied arguments go last, verbatim
    cmd.args.extend(config.launch.extra_args.iter().cloned());

    cmd.args
}
