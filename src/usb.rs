//! USB access to the CM160.
//!
//! The monitor sits behind a CP210x serial bridge.  The bridge has to be configured with vendor
//! control transfers before the bulk endpoints will carry any data.

use std::time::Duration;

use anyhow::{Context as _, Result};
use cm160::{Transport, TransportError};
use log::{debug, info};
use rusb::{
    ConfigDescriptor, Context, DeviceHandle, Direction, Recipient, RequestType, TransferType,
    UsbContext,
};

const CP210X_IFC_ENABLE: u8 = 0x00;
const CP210X_SET_BAUDRATE: u8 = 0x1e;

const UART_ENABLE: u16 = 0x0001;
const UART_DISABLE: u16 = 0x0000;

const CONTROL_TIMEOUT: Duration = Duration::from_millis(500);
const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

const INTERFACE: u8 = 0;

// Where the endpoints normally are, if the descriptors don't say.
const EP_IN: u8 = 0x82;
const EP_OUT: u8 = 0x01;

pub struct Cm160 {
    handle: DeviceHandle<Context>,
    ep_in: u8,
    ep_out: u8,
}

impl Cm160 {
    /// Find the first matching device, and set up the bridge.
    pub fn open(vendor: u16, product: u16) -> Result<Cm160> {
        let context = Context::new()?;

        let device = context
            .devices()?
            .iter()
            .find(|d| {
                d.device_descriptor()
                    .map(|desc| desc.vendor_id() == vendor && desc.product_id() == product)
                    .unwrap_or(false)
            })
            .ok_or(cm160::Error::DeviceNotFound { vendor, product })?;

        info!(
            "Bus {:03} Device {:03} ID {:04x}:{:04x}",
            device.bus_number(),
            device.address(),
            vendor,
            product,
        );

        let mut handle = device.open().context("opening device")?;

        // Usually there is nothing attached, and this fails.
        if let Err(e) = handle.detach_kernel_driver(INTERFACE) {
            debug!("detach kernel driver: {}", e);
        }

        // Use the first configuration the device offers.
        let first = device
            .config_descriptor(0)
            .context("reading configuration descriptor")?;
        handle
            .set_active_configuration(first.number())
            .context("setting configuration")?;
        handle
            .claim_interface(INTERFACE)
            .context("claiming interface")?;

        let config = device.active_config_descriptor()?;
        let (ep_in, ep_out) = bulk_endpoints(&config).unwrap_or((EP_IN, EP_OUT));
        debug!("bulk endpoints: in {:02x}, out {:02x}", ep_in, ep_out);

        let request_type =
            rusb::request_type(Direction::Out, RequestType::Vendor, Recipient::Interface);
        let index = INTERFACE as u16;
        handle
            .write_control(
                request_type,
                CP210X_IFC_ENABLE,
                UART_ENABLE,
                index,
                &[],
                CONTROL_TIMEOUT,
            )
            .context("enabling uart")?;
        handle
            .write_control(
                request_type,
                CP210X_SET_BAUDRATE,
                0,
                index,
                &cm160::BAUD_RATE.to_le_bytes(),
                CONTROL_TIMEOUT,
            )
            .context("setting baud rate")?;
        handle
            .write_control(
                request_type,
                CP210X_IFC_ENABLE,
                UART_DISABLE,
                index,
                &[],
                CONTROL_TIMEOUT,
            )
            .context("disabling uart")?;

        Ok(Cm160 {
            handle,
            ep_in,
            ep_out,
        })
    }
}

/// Find the bulk in and out endpoints on the first interface.
fn bulk_endpoints(config: &ConfigDescriptor) -> Option<(u8, u8)> {
    let iface = config.interfaces().find(|i| i.number() == INTERFACE)?;
    let desc = iface.descriptors().next()?;

    let mut in_ep = None;
    let mut out_ep = None;
    for endpoint in desc.endpoint_descriptors() {
        if endpoint.transfer_type() != TransferType::Bulk {
            continue;
        }
        match endpoint.direction() {
            Direction::In => in_ep = in_ep.or(Some(endpoint.address())),
            Direction::Out => out_ep = out_ep.or(Some(endpoint.address())),
        }
    }

    Some((in_ep?, out_ep?))
}

fn transport_error(err: rusb::Error) -> TransportError {
    match err {
        rusb::Error::Timeout => TransportError::Timeout,
        rusb::Error::Busy => TransportError::Busy,
        rusb::Error::NoDevice => TransportError::Disconnected,
        err => TransportError::Io(err.to_string()),
    }
}

impl Transport for Cm160 {
    fn read(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> std::result::Result<usize, TransportError> {
        self.handle
            .read_bulk(self.ep_in, buf, timeout)
            .map_err(transport_error)
    }

    fn write(&mut self, data: &[u8]) -> std::result::Result<(), TransportError> {
        let count = self
            .handle
            .write_bulk(self.ep_out, data, WRITE_TIMEOUT)
            .map_err(transport_error)?;
        if count != data.len() {
            return Err(TransportError::Io(format!(
                "short write: {} of {} bytes",
                count,
                data.len()
            )));
        }
        Ok(())
    }
}
