use core::fmt::Debug;

use super::{
    average, build_tables, gesture_held, is_reset_gesture, parse_axis, Axis, Coordinate,
    CoordinateTables, Module, PassThrough, Ready, TouchBuffer, TouchMask, TouchpadConfig,
    TouchpadError, MODULES,
};
use embedded_hal_async::delay::DelayNs;

/// A capacitive sensor module as seen by [`TouchpadAsync`].
#[allow(async_fn_in_trait)]
pub trait TouchSensor {
    type Error: Debug;

    async fn begin(&mut self, address: u8) -> Result<(), Self::Error>;

    async fn touched(&mut self) -> Result<TouchMask, Self::Error>;
}

#[derive(Debug)]
pub struct TouchpadAsync<S, DELAY, B = PassThrough> {
    sensors: [S; MODULES],
    delay: DELAY,
    buffer: B,
    config: TouchpadConfig,
    ready: Option<Ready>,
}

impl<S, DELAY> TouchpadAsync<S, DELAY>
where
    S: TouchSensor,
    DELAY: DelayNs,
{
    pub fn new(sensor1: S, sensor2: S, delay: DELAY) -> Self {
        Self::with_config(sensor1, sensor2, delay, TouchpadConfig::default())
    }

    pub fn with_config(sensor1: S, sensor2: S, delay: DELAY, config: TouchpadConfig) -> Self {
        Self {
            sensors: [sensor1, sensor2],
            delay,
            buffer: PassThrough,
            config,
            ready: None,
        }
    }
}

impl<S, DELAY, B> TouchpadAsync<S, DELAY, B>
where
    S: TouchSensor,
    DELAY: DelayNs,
    B: TouchBuffer,
{
    pub fn with_buffer<B2: TouchBuffer>(self, buffer: B2) -> TouchpadAsync<S, DELAY, B2> {
        TouchpadAsync {
            sensors: self.sensors,
            delay: self.delay,
            buffer,
            config: self.config,
            ready: self.ready,
        }
    }

    pub async fn initialize(
        &mut self,
        address1: u8,
        address2: u8,
    ) -> Result<(), TouchpadError<S::Error>> {
        let addresses = [address1, address2];
        self.begin_sensors(addresses).await?;
        self.ready = Some(Ready {
            addresses,
            tables: build_tables(self.config.layout),
        });

        #[cfg(feature = "defmt")]
        defmt::info!("Touchpad ready at 0x{:02X}/0x{:02X}", address1, address2);
        #[cfg(feature = "log-04")]
        log::info!("Touchpad ready at 0x{address1:02X}/0x{address2:02X}");
        Ok(())
    }

    pub async fn get_position(&mut self, axis: Axis) -> Result<u8, TouchpadError<S::Error>> {
        self.poll(|tables, masks| average(tables, masks, axis)).await
    }

    pub async fn get_position_raw(&mut self, axis: u8) -> Result<u8, TouchpadError<S::Error>> {
        let axis = parse_axis(axis)?;
        self.get_position(axis).await
    }

    pub async fn position(&mut self) -> Result<Coordinate, TouchpadError<S::Error>> {
        self.poll(|tables, masks| {
            Coordinate::new(
                average(tables, masks, Axis::X),
                average(tables, masks, Axis::Y),
            )
        })
        .await
    }

    pub fn is_ready(&self) -> bool {
        self.ready.is_some()
    }

    pub fn tables(&self) -> Option<&CoordinateTables> {
        self.ready.as_ref().map(|ready| &ready.tables)
    }

    pub fn addresses(&self) -> Option<[u8; MODULES]> {
        self.ready.map(|ready| ready.addresses)
    }

    pub fn config(&self) -> &TouchpadConfig {
        &self.config
    }

    pub fn release(self) -> (S, S, DELAY) {
        let [sensor1, sensor2] = self.sensors;
        (sensor1, sensor2, self.delay)
    }

    async fn poll<T>(
        &mut self,
        reduce: impl FnOnce(&CoordinateTables, &[TouchMask; MODULES]) -> T,
    ) -> Result<T, TouchpadError<S::Error>> {
        let ready = self.ready.ok_or(TouchpadError::Uninitialized)?;

        let masks = self.read_masks().await?;
        let mut buffered = masks;
        self.buffer.buffer(&mut buffered);
        let result = reduce(&ready.tables, &buffered);

        if is_reset_gesture(&masks, &self.config.reset_gesture) {
            #[cfg(feature = "defmt")]
            defmt::info!("Soft reset gesture held, waiting for release");
            #[cfg(feature = "log-04")]
            log::info!("Soft reset gesture held, waiting for release");

            self.wait_for_release().await?;
            self.delay.delay_ms(self.config.reset_settle_ms).await;
            self.begin_sensors(ready.addresses).await?;

            #[cfg(feature = "defmt")]
            defmt::info!("Touch sensors re-initialized");
            #[cfg(feature = "log-04")]
            log::info!("Touch sensors re-initialized");
        }

        Ok(result)
    }

    async fn read_masks(&mut self) -> Result<[TouchMask; MODULES], TouchpadError<S::Error>> {
        let [first, second] = &mut self.sensors;
        Ok([
            first.touched().await.map_err(TouchpadError::Sensor)?,
            second.touched().await.map_err(TouchpadError::Sensor)?,
        ])
    }

    async fn begin_sensors(
        &mut self,
        addresses: [u8; MODULES],
    ) -> Result<(), TouchpadError<S::Error>> {
        for ((module, sensor), address) in Module::ALL
            .into_iter()
            .zip(self.sensors.iter_mut())
            .zip(addresses)
        {
            if let Err(_err) = sensor.begin(address).await {
                #[cfg(feature = "defmt")]
                defmt::error!("MPR121 {} not found at 0x{:02X}", module, address);
                #[cfg(feature = "log-04")]
                log::error!("MPR121 {module} not found at 0x{address:02X}: {_err:?}");
                return Err(TouchpadError::NotFound { module, address });
            }
        }
        Ok(())
    }

    async fn wait_for_release(&mut self) -> Result<(), TouchpadError<S::Error>> {
        let gesture = self.config.reset_gesture;
        let step = self.config.release_poll_ms.max(1);
        let mut waited: u32 = 0;

        loop {
            let masks = self.read_masks().await?;
            if !gesture_held(&masks, &gesture) {
                return Ok(());
            }
            if let Some(timeout) = self.config.release_timeout_ms {
                if waited >= timeout {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("Reset gesture still held after {} ms", waited);
                    #[cfg(feature = "log-04")]
                    log::warn!("Reset gesture still held after {waited} ms");
                    return Err(TouchpadError::ReleaseTimeout);
                }
            }
            self.delay.delay_ms(step).await;
            waited = waited.saturating_add(step);
        }
    }
}
