use embedded_sdmmc::{BlockDevice, Error, Mode, TimeSource, VolumeIdx, VolumeManager};

use super::TextResource;

/// Baseline file in the root directory of the first FAT volume.
///
/// The SD card operations are blocking. Every call opens and closes the
/// volume, so the card can be removed between saves.
pub struct SdCardResource<'a, D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    volume_mgr: VolumeManager<D, T, 4, 4, 1>,
    file_name: &'a str,
}

impl<'a, D, T> SdCardResource<'a, D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    /// `file_name` must be a valid 8.3 short name, such as `BASELINE.TXT`.
    pub fn new(block_device: D, ts: T, file_name: &'a str) -> Self {
        let volume_mgr = VolumeManager::new(block_device, ts);

        Self {
            volume_mgr,
            file_name,
        }
    }

    pub fn file_name(&self) -> &str {
        self.file_name
    }
}

impl<D, T> TextResource for SdCardResource<'_, D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    type Error = Error<D::Error>;

    fn read(&mut self, buffer: &mut [u8]) -> Result<Option<usize>, Self::Error> {
        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume0.open_root_dir()?;

        // The file borrows the directory, so it is closed inside the match
        // before the directory and volume are.
        let len = match root_dir.open_file_in_dir(self.file_name, Mode::ReadOnly) {
            Ok(file) => {
                let len = file.length() as usize;
                let mut filled = 0;
                while filled < buffer.len().min(len) {
                    let bytes_read = file.read(&mut buffer[filled..])?;
                    if bytes_read == 0 {
                        break; // EOF
                    }
                    filled += bytes_read;
                }
                file.close()?;
                Some(len)
            }
            Err(Error::NotFound) => None,
            Err(e) => return Err(e),
        };

        root_dir.close()?;
        volume0.close()?;

        Ok(len)
    }

    fn overwrite(&mut self, contents: &[u8]) -> Result<(), Self::Error> {
        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume0.open_root_dir()?;
        let file = root_dir.open_file_in_dir(self.file_name, Mode::ReadWriteCreateOrTruncate)?;

        file.write(contents)?;

        file.close()?;
        root_dir.close()?;
        volume0.close()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{BaselineLoad, BaselineRecord, BaselineStore};
    use core::cell::RefCell;
    use embassy_time::{Duration, Instant};
    use embedded_sdmmc::{Block, BlockCount, BlockIdx, Timestamp};
    use std::collections::BTreeMap;

    const FILE_NAME: &str = "BASELINE.TXT";
    const INTERVAL: Duration = Duration::from_secs(3600);

    const PARTITION_START: u32 = 1;
    /// Smallest round size that still has enough clusters to be FAT16.
    const PARTITION_BLOCKS: u32 = 8192;
    const FAT_BLOCKS: u16 = 32;
    const ROOT_ENTRIES: u16 = 512;

    /// Card that fails every block access, as when it is missing.
    struct AbsentCard;

    #[derive(Debug, PartialEq, Eq)]
    struct CardMissing;

    impl BlockDevice for AbsentCard {
        type Error = CardMissing;

        fn read(&self, _blocks: &mut [Block], _start: BlockIdx) -> Result<(), Self::Error> {
            Err(CardMissing)
        }

        fn write(&self, _blocks: &[Block], _start: BlockIdx) -> Result<(), Self::Error> {
            Err(CardMissing)
        }

        fn num_blocks(&self) -> Result<BlockCount, Self::Error> {
            Err(CardMissing)
        }
    }

    /// Sparse RAM card; blocks never written read back as zeros.
    struct RamCard {
        blocks: RefCell<BTreeMap<u32, [u8; Block::LEN]>>,
    }

    impl RamCard {
        /// An MBR with one empty FAT16 partition.
        fn formatted() -> Self {
            let mut mbr = [0u8; Block::LEN];
            let entry = &mut mbr[446..462];
            entry[4] = 0x06; // FAT16
            entry[8..12].copy_from_slice(&PARTITION_START.to_le_bytes());
            entry[12..16].copy_from_slice(&PARTITION_BLOCKS.to_le_bytes());
            mbr[510..512].copy_from_slice(&[0x55, 0xAA]);

            let mut bpb = [0u8; Block::LEN];
            bpb[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
            bpb[3..11].copy_from_slice(b"AIRSENSE");
            bpb[11..13].copy_from_slice(&512u16.to_le_bytes());
            bpb[13] = 1; // blocks per cluster
            bpb[14..16].copy_from_slice(&1u16.to_le_bytes()); // reserved blocks
            bpb[16] = 1; // one FAT
            bpb[17..19].copy_from_slice(&ROOT_ENTRIES.to_le_bytes());
            bpb[19..21].copy_from_slice(&(PARTITION_BLOCKS as u16).to_le_bytes());
            bpb[21] = 0xF8;
            bpb[22..24].copy_from_slice(&FAT_BLOCKS.to_le_bytes());
            bpb[43..54].copy_from_slice(b"AIRSENSE   ");
            bpb[510..512].copy_from_slice(&[0x55, 0xAA]);

            // Entries 0 and 1 of the FAT are reserved.
            let mut fat = [0u8; Block::LEN];
            fat[0..4].copy_from_slice(&[0xF8, 0xFF, 0xFF, 0xFF]);

            let mut blocks = BTreeMap::new();
            blocks.insert(0, mbr);
            blocks.insert(PARTITION_START, bpb);
            blocks.insert(PARTITION_START + 1, fat);
            Self {
                blocks: RefCell::new(blocks),
            }
        }
    }

    impl BlockDevice for RamCard {
        type Error = CardMissing;

        fn read(&self, blocks: &mut [Block], start: BlockIdx) -> Result<(), Self::Error> {
            let stored = self.blocks.borrow();
            for (idx, block) in (start.0..).zip(blocks.iter_mut()) {
                block.contents = stored.get(&idx).copied().unwrap_or([0; Block::LEN]);
            }
            Ok(())
        }

        fn write(&self, blocks: &[Block], start: BlockIdx) -> Result<(), Self::Error> {
            let mut stored = self.blocks.borrow_mut();
            for (idx, block) in (start.0..).zip(blocks.iter()) {
                stored.insert(idx, block.contents);
            }
            Ok(())
        }

        fn num_blocks(&self) -> Result<BlockCount, Self::Error> {
            Ok(BlockCount(PARTITION_START + PARTITION_BLOCKS))
        }
    }

    struct FixedTime;

    impl TimeSource for FixedTime {
        fn get_timestamp(&self) -> Timestamp {
            Timestamp {
                year_since_1970: 56,
                zero_indexed_month: 9,
                zero_indexed_day: 17,
                hours: 12,
                minutes: 0,
                seconds: 0,
            }
        }
    }

    fn formatted_resource() -> SdCardResource<'static, RamCard, FixedTime> {
        SdCardResource::new(RamCard::formatted(), FixedTime, FILE_NAME)
    }

    #[test]
    fn test_missing_file_is_absent() {
        let mut resource = formatted_resource();
        let mut buffer = [0u8; 16];
        assert!(matches!(resource.read(&mut buffer), Ok(None)));

        // The volume was closed again, so the next access still works.
        let mut store = BaselineStore::new(resource, INTERVAL);
        assert_eq!(store.load(), BaselineLoad::NotFound);
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let record = BaselineRecord {
            eco2_baseline: 37642,
            tvoc_baseline: 1205,
        };
        let mut store = BaselineStore::new(formatted_resource(), INTERVAL);

        store.save(record, Instant::from_secs(1)).unwrap();

        assert_eq!(store.load(), BaselineLoad::Found(record));
    }

    #[test]
    fn test_overwrite_truncates_and_reports_full_length() {
        let mut resource = formatted_resource();
        resource.overwrite(b"37642,1205\n").unwrap();

        let mut short = [0u8; 4];
        assert!(matches!(resource.read(&mut short), Ok(Some(11))));
        assert_eq!(&short, b"3764");

        resource.overwrite(b"1,2\n").unwrap();
        let mut buffer = [0u8; 16];
        assert!(matches!(resource.read(&mut buffer), Ok(Some(4))));
        assert_eq!(&buffer[..4], b"1,2\n");
    }

    #[test]
    fn test_missing_card_reports_device_error() {
        let mut resource = SdCardResource::new(AbsentCard, FixedTime, FILE_NAME);
        let mut buffer = [0u8; 16];
        assert!(matches!(
            resource.read(&mut buffer),
            Err(Error::DeviceError(CardMissing))
        ));
        assert!(matches!(
            resource.overwrite(b"1,2\n"),
            Err(Error::DeviceError(CardMissing))
        ));
    }

    #[test]
    fn test_missing_card_is_not_found_and_write_failure() {
        let resource = SdCardResource::new(AbsentCard, FixedTime, FILE_NAME);
        let mut store = BaselineStore::new(resource, INTERVAL);

        assert_eq!(store.load(), BaselineLoad::NotFound);
        assert!(store.save(BaselineRecord::default(), Instant::from_secs(1)).is_err());
        assert_eq!(store.last_saved(), None);
    }
}
