use serde::{Deserialize, Serialize};

/// Information about a serial port the device might be attached to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    /// Device path used to open the port (e.g. `/dev/ttyACM0`, `COM3`)
    pub device_name: String,

    /// USB product string, if the port is a USB device
    pub product: Option<String>,

    /// USB manufacturer string
    pub manufacturer: Option<String>,

    /// USB vendor and product id
    pub usb_id: Option<(u16, u16)>,
}

impl PortInfo {
    /// Create a new port info with just the device name
    pub fn new(device_name: String) -> Self {
        Self {
            device_name,
            product: None,
            manufacturer: None,
            usb_id: None,
        }
    }

    /// Set the USB product and manufacturer strings
    pub fn with_usb(mut self, vid: u16, pid: u16, product: Option<String>, manufacturer: Option<String>) -> Self {
        self.usb_id = Some((vid, pid));
        self.product = product;
        self.manufacturer = manufacturer;
        self
    }

    /// Short human description, falling back to "n/a"
    pub fn description(&self) -> String {
        match (&self.product, &self.manufacturer) {
            (Some(product), _) if !product.is_empty() => product.clone(),
            (_, Some(manufacturer)) if !manufacturer.is_empty() => manufacturer.clone(),
            _ => "n/a".to_string(),
        }
    }

    /// Device path, description and USB id on one line
    pub fn formatted_display(&self) -> String {
        match self.usb_id {
            Some((vid, pid)) => format!(
                "{} - {} [USB {:04x}:{:04x}]",
                self.device_name,
                self.description(),
                vid,
                pid
            ),
            None => format!("{} - {}", self.device_name, self.description()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefers_product_string() {
        let port = PortInfo::new("/dev/ttyACM0".to_string()).with_usb(
            0x303a,
            0x1001,
            Some("USB JTAG/serial debug unit".to_string()),
            Some("Espressif".to_string()),
        );
        assert_eq!(
            port.formatted_display(),
            "/dev/ttyACM0 - USB JTAG/serial debug unit [USB 303a:1001]"
        );
    }

    #[test]
    fn display_without_usb_details() {
        let port = PortInfo::new("/dev/ttyS0".to_string());
        assert_eq!(port.formatted_display(), "/dev/ttyS0 - n/a");
    }
}
