//! Netlist emission.
//!
//! Each mesh node becomes a circuit node `N{x}{sep}{y}` whose voltage is the
//! cell temperature. Conductances become resistors, heat sources and Norton
//! boundaries become current sources.

use indexmap::IndexMap;

use pcbtherm_core::{BoundaryStrategy, ThermalSystem};

use crate::config::SpiceConfig;

/// A rendered netlist and the table mapping its node names to node ids.
#[derive(Debug, Clone)]
pub struct Netlist {
    text: String,
    nodes: IndexMap<String, usize>,
}

impl Netlist {
    /// Emit the netlist for an assembled system.
    pub fn emit(system: &ThermalSystem, config: &SpiceConfig) -> Self {
        let sep = config.node_separator.as_str();
        let suffix = |node: usize| {
            let (x, y) = system.coords[node];
            format!("{x}{sep}{y}")
        };

        let mut nodes = IndexMap::with_capacity(system.node_count());
        for node in 0..system.node_count() {
            nodes.insert(format!("N{}", suffix(node)), node);
        }

        let mut lines = vec!["* Thermal network".to_string()];

        for edge in &system.edges {
            let (ax, _) = system.coords[edge.a];
            let (bx, _) = system.coords[edge.b];
            let prefix = if bx != ax { "RFR" } else { "RFD" };
            lines.push(format!(
                "{prefix}{s} N{s} N{t} {r:e}",
                s = suffix(edge.a),
                t = suffix(edge.b),
                r = edge.resistance()
            ));
        }

        for record in &system.boundaries {
            let s = suffix(record.node);
            let r = 1.0 / record.conductance;
            match system.strategy {
                BoundaryStrategy::Norton => {
                    lines.push(format!(
                        "IB{s} 0 N{s} DC {:e}",
                        record.temperature * record.conductance
                    ));
                    lines.push(format!("RDIRI{s} N{s} 0 {r:e}"));
                }
                BoundaryStrategy::SaddlePoint => {
                    lines.push(format!("VB{s} NDIRI{s} 0 DC {:e}", record.temperature));
                    lines.push(format!("RDIRI{s} N{s} NDIRI{s} {r:e}"));
                }
            }
        }

        for (node, &heat) in system.heat.iter().enumerate() {
            if heat != 0.0 {
                let s = suffix(node);
                lines.push(format!("IH{s} N{s} 0 DC {:e}", -heat));
            }
        }

        if system.damping > 0.0 {
            let r = 1.0 / system.damping;
            for node in 0..system.node_count() {
                let s = suffix(node);
                lines.push(format!("RG{s} N{s} 0 {r:e}"));
            }
        }

        lines.extend(config.analysis.control_lines());
        lines.push(".end".to_string());

        let mut text = lines.join("\n");
        text.push('\n');

        log::debug!(
            "Netlist: {} nodes, {} resistors, {} boundary sources",
            nodes.len(),
            system.edges.len(),
            system.boundaries.len()
        );
        Self { text, nodes }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Node name to node id, in node order.
    pub fn nodes(&self) -> &IndexMap<String, usize> {
        &self.nodes
    }

    /// Node id for a simulator variable name, ignoring case and an optional
    /// `V(...)` wrapper.
    pub fn lookup(&self, variable: &str) -> Option<usize> {
        let name = strip_voltage_wrapper(variable);
        self.nodes
            .get(name)
            .or_else(|| {
                self.nodes
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v)
            })
            .copied()
    }
}

fn strip_voltage_wrapper(name: &str) -> &str {
    let name = name.trim();
    let bytes = name.as_bytes();
    if bytes.len() > 3
        && bytes[0].eq_ignore_ascii_case(&b'v')
        && bytes[1] == b'('
        && bytes[bytes.len() - 1] == b')'
    {
        &name[2..name.len() - 1]
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcbtherm_core::{
        Assembler, AssemblyOptions, GridField, LayerRegistry, NodeIndexer, ThermalLayers,
    };

    /// 2x2 mesh, left column held at 25 degrees, 1 W into (1, 1).
    fn square(options: AssemblyOptions) -> ThermalSystem {
        let registry = LayerRegistry::standard();
        let layers = ThermalLayers::resolve(&registry).unwrap();
        let mut grid = GridField::new(2, 2, &registry).unwrap();
        grid.fill_double(layers.resis, 0..2, 0..2, 1.0);
        grid.fill_int(layers.isoflag, 0..1, 0..2, 1);
        grid.fill_double(layers.isodeg, 0..1, 0..2, 25.0);
        grid.set_double(1, 1, layers.heat, 1.0);
        let indexer = NodeIndexer::build(&mut grid, layers.holeflag).unwrap();
        Assembler::new(options)
            .assemble(&grid, &indexer, &layers, 1000.0)
            .unwrap()
    }

    #[test]
    fn norton_netlist() {
        let system = square(AssemblyOptions::default());
        let netlist = Netlist::emit(&system, &SpiceConfig::default());
        let text = netlist.text();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "* Thermal network");
        assert!(lines.contains(&"RFR0U0 N0U0 N1U0 1e0"));
        assert!(lines.contains(&"RFD0U0 N0U0 N0U1 1e0"));
        assert!(lines.contains(&"IB0U1 0 N0U1 DC 2.5e4"));
        assert!(lines.contains(&"RDIRI0U1 N0U1 0 1e-3"));
        assert!(lines.contains(&"IH1U1 N1U1 0 DC -1e0"));
        assert!(!text.contains("RG"));
        assert_eq!(&lines[lines.len() - 3..], &[".tran 0.1 0.1", ".print tran", ".end"]);

        assert_eq!(lines.iter().filter(|l| l.starts_with("RF")).count(), 4);
        assert_eq!(lines.iter().filter(|l| l.starts_with("IB")).count(), 2);
    }

    #[test]
    fn saddle_point_uses_voltage_sources() {
        let options = AssemblyOptions::default().with_boundary(BoundaryStrategy::SaddlePoint);
        let system = square(options);
        let netlist = Netlist::emit(&system, &SpiceConfig::default());
        let lines: Vec<&str> = netlist.text().lines().collect();
        assert!(lines.contains(&"VB0U0 NDIRI0U0 0 DC 2.5e1"));
        assert!(lines.contains(&"RDIRI0U0 N0U0 NDIRI0U0 1e-3"));
        assert!(!netlist.text().contains("IB"));
        // Virtual nodes are not mesh nodes.
        assert_eq!(netlist.nodes().len(), 4);
    }

    #[test]
    fn damping_shunts_every_node() {
        let system = square(AssemblyOptions::default().with_damping(0.5));
        let netlist = Netlist::emit(&system, &SpiceConfig::default());
        let shunts: Vec<&str> = netlist
            .text()
            .lines()
            .filter(|l| l.starts_with("RG"))
            .collect();
        assert_eq!(shunts.len(), 4);
        assert!(shunts.contains(&"RG1U0 N1U0 0 2e0"));
    }

    #[test]
    fn name_table_lookup() {
        let system = square(AssemblyOptions::default());
        let mut config = SpiceConfig::default();
        config.node_separator = "_".into();
        let netlist = Netlist::emit(&system, &config);

        let names: Vec<&String> = netlist.nodes().keys().collect();
        assert_eq!(names, vec!["N0_0", "N0_1", "N1_0", "N1_1"]);
        assert_eq!(netlist.lookup("N1_0"), Some(2));
        assert_eq!(netlist.lookup("v(n1_1)"), Some(3));
        assert_eq!(netlist.lookup("V(N0_1)"), Some(1));
        assert_eq!(netlist.lookup("time"), None);
    }
}
