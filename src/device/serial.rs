//! Serial port access for the capture device

use log::{debug, info};
use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};
use std::io::{self, BufRead, Write};
use std::time::Duration;

use crate::device::handshake::Connector;
use crate::models::port::PortInfo;
use crate::models::settings::ProtocolSettings;
use crate::utils::error::{AppError, AppResult};

/// Opens a serial port at the negotiated bit rate, 8N1, no flow control.
///
/// Reads time out after the poll interval so a blocked read can notice Ctrl-C.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    path: String,
    baud_rate: u32,
    poll_interval: Duration,
}

impl SerialConnector {
    pub fn new(path: impl Into<String>, settings: &ProtocolSettings) -> Self {
        Self {
            path: path.into(),
            baud_rate: settings.baud_rate,
            poll_interval: settings.poll_interval,
        }
    }
}

impl Connector for SerialConnector {
    type Connection = Box<dyn SerialPort>;

    fn port_name(&self) -> &str {
        &self.path
    }

    fn connect(&self) -> io::Result<Self::Connection> {
        let port = serialport::new(self.path.as_str(), self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.poll_interval)
            .open()?;

        info!("Opened serial port: {} at {} baud", self.path, self.baud_rate);
        Ok(port)
    }
}

/// Serial ports present on this host, sorted by device name
pub fn list_ports() -> AppResult<Vec<PortInfo>> {
    let mut ports: Vec<PortInfo> = serialport::available_ports()?
        .into_iter()
        .map(|port| match port.port_type {
            SerialPortType::UsbPort(usb) => {
                PortInfo::new(port.port_name).with_usb(usb.vid, usb.pid, usb.product, usb.manufacturer)
            }
            _ => PortInfo::new(port.port_name),
        })
        .collect();
    ports.sort_by(|a, b| a.device_name.cmp(&b.device_name));
    debug!("Found {} serial ports", ports.len());
    Ok(ports)
}

/// Pick a port: the only one if there is one, otherwise ask.
///
/// The menu goes to `prompt`, the answer comes from `input`. An empty answer
/// picks the first port.
pub fn select_port<R: BufRead, W: Write>(
    ports: &[PortInfo],
    input: &mut R,
    prompt: &mut W,
) -> AppResult<String> {
    for (index, port) in ports.iter().enumerate() {
        writeln!(prompt, "{} - {}", index + 1, port.formatted_display())?;
    }

    let port = match ports {
        [] => return Err(AppError::NoPorts),
        [only] => only,
        _ => {
            write!(prompt, "Select a serial port (default \"1\"): ")?;
            prompt.flush()?;

            let mut answer = String::new();
            input.read_line(&mut answer)?;
            let answer = answer.trim();

            let choice = if answer.is_empty() {
                1
            } else {
                answer
                    .parse::<usize>()
                    .map_err(|_| AppError::InvalidSelection(answer.to_string()))?
            };
            if choice == 0 || choice > ports.len() {
                return Err(AppError::InvalidSelection(answer.to_string()));
            }
            &ports[choice - 1]
        }
    };

    info!("Using serial port \"{}\"", port.device_name);
    Ok(port.device_name.clone())
}
