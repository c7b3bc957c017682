//! NFS exports table rendering

use storstack_common::Result;
use storstack_config::Configuration;

/// Render `/etc/exports`, one line per export volume
///
/// Every host of every paired host group gets the paired option set, e.g.
/// `/export/home 192.168.1.0/24(rw,sync) backup.lan(ro)`.
pub fn render_exports(config: &Configuration) -> Result<String> {
    let mut lines = Vec::with_capacity(config.export.volumes.len());
    for volume in &config.export.volumes {
        let mut line = volume.path.clone();
        for pairing in &volume.host_group_options {
            let group = config.find_host_group(&pairing.host_group)?;
            let options = config.find_export_options(&pairing.option)?;
            for host in &group.hosts {
                line.push(' ');
                line.push_str(host);
                line.push('(');
                line.push_str(&options.value);
                line.push(')');
            }
        }
        lines.push(line);
    }
    Ok(lines.join("\n"))
}
